// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Pattern Source Element
//!
//! `patternsrc` produces interleaved S16LE audio with a square or saw wave
//! (or silence). It only overrides `fill`, so the buffer allocation is left
//! to the registry's adapter.
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 patternsrc num-buffers=100 ! audioconvert ! autoaudiosink
//! ```

use customsrc::Registry;
use gst::glib;
use gstreamer as gst;

/// Core implementation (extension points)
mod imp;

/// Sample generation
mod render;

/// Settings and their defaults
mod state;

pub use imp::PatternSrc;
pub use state::{Settings, Wave};

/// Factory name of the element.
pub const ELEMENT_NAME: &str = "patternsrc";

/// Registers the patternsrc element with GStreamer.
///
/// # Errors
/// Fails if the class cannot be registered or the factory name is taken.
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    let descriptor = Registry::global()
        .get_or_create::<PatternSrc>()
        .map_err(|err| glib::bool_error!("Failed to register {}: {}", ELEMENT_NAME, err))?;

    descriptor.register_element(Some(plugin), ELEMENT_NAME, gst::Rank::NONE)
}

/// Applies `settings` to a patternsrc element.
///
/// # Returns
/// `false` if `element` is not a patternsrc
pub fn configure(element: &gst::Element, settings: Settings) -> bool {
    match imp_of(element) {
        Some(imp) => {
            imp.set_settings(settings);
            true
        }
        None => false,
    }
}

/// Current settings of a patternsrc element.
pub fn settings(element: &gst::Element) -> Option<Settings> {
    imp_of(element).map(PatternSrc::settings)
}

fn imp_of(element: &gst::Element) -> Option<&PatternSrc> {
    Registry::global()
        .lookup::<PatternSrc>()?
        .imp_of::<PatternSrc>(element)
}
