// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! GStreamer plugin with source elements built on the `customsrc` registry.
//!
//! - **patternsrc**: periodic audio test patterns, produced by filling
//!   buffers allocated on its behalf; seekable in bytes and with a known
//!   size when the sample count is limited
//! - **countersrc**: a stream of big-endian counters, produced by creating
//!   buffers itself; negotiates the counter width through caps
//!
//! Neither element is a `glib::subclass` type. Both are plain Rust structs
//! whose extension points are wired into a `GstBaseSrc` subclass by
//! [`customsrc::Registry`]. Runtime settings are applied through
//! [`patternsrc::configure`] and [`countersrc::configure`].

use gst::glib;
use gstreamer as gst;

pub mod countersrc;
pub mod patternsrc;

fn plugin_init(plugin: &gst::Plugin) -> Result<(), glib::BoolError> {
    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::filter::LevelFilter;
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .compact()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(false)
            .with_max_level(LevelFilter::TRACE)
            .with_ansi(true)
            .finish()
            .try_init();
    }

    patternsrc::register(plugin)?;
    countersrc::register(plugin)?;

    Ok(())
}

gst::plugin_define!(
    customsrc,
    env!("CARGO_PKG_DESCRIPTION"),
    plugin_init,
    concat!(env!("CARGO_PKG_VERSION"), "-", env!("COMMIT_ID")),
    "Apache-2.0",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_REPOSITORY"),
    env!("BUILD_REL_DATE")
);
