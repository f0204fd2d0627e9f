// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Counter Source Element
//!
//! `countersrc` pushes one counter per buffer, encoded big-endian in 32 or
//! 64 bits depending on what downstream accepts.
//!
//! ## Example Pipeline
//! ```bash
//! gst-launch-1.0 countersrc ! "application/x-customsrc-counter,width=32" ! fakesink dump=true
//! ```

use customsrc::Registry;
use gst::glib;
use gstreamer as gst;

/// Core implementation (extension points)
mod imp;

/// Settings, runtime state and their defaults
mod state;

pub use imp::CounterSrc;
pub use state::Settings;

/// Factory name of the element.
pub const ELEMENT_NAME: &str = "countersrc";

/// Registers the countersrc element with GStreamer.
///
/// # Errors
/// Fails if the class cannot be registered or the factory name is taken.
pub fn register(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    let descriptor = Registry::global()
        .get_or_create::<CounterSrc>()
        .map_err(|err| glib::bool_error!("Failed to register {}: {}", ELEMENT_NAME, err))?;

    descriptor.register_element(Some(plugin), ELEMENT_NAME, gst::Rank::NONE)
}

/// Applies `settings` to a countersrc element. Takes effect at the next
/// start.
///
/// # Returns
/// `false` if `element` is not a countersrc
pub fn configure(element: &gst::Element, settings: Settings) -> bool {
    match imp_of(element) {
        Some(imp) => {
            imp.set_settings(settings);
            true
        }
        None => false,
    }
}

pub fn settings(element: &gst::Element) -> Option<Settings> {
    imp_of(element).map(CounterSrc::settings)
}

/// Counters produced by a countersrc element since its last start.
pub fn produced(element: &gst::Element) -> Option<u64> {
    imp_of(element).map(CounterSrc::produced)
}

fn imp_of(element: &gst::Element) -> Option<&CounterSrc> {
    Registry::global()
        .lookup::<CounterSrc>()?
        .imp_of::<CounterSrc>(element)
}
