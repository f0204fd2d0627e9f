// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! The subclassing contract.
//!
//! A custom source is a Rust type implementing [`SubclassInfo`] (class-level
//! declarations) and [`CustomSrcImpl`] (the extension points). Every
//! extension point has a default body that matches the behaviour of an
//! element which does not support it. Implement the trait through
//! [`custom_src_impl!`](crate::custom_src_impl) so that the set of overridden
//! points is recorded automatically:
//!
//! ```no_run
//! use customsrc::{SubclassInfo, custom_src_impl};
//! use gstreamer as gst;
//!
//! #[derive(Default)]
//! struct ZeroSrc;
//!
//! impl SubclassInfo for ZeroSrc {
//!     const NAME: &'static str = "GstRsZeroSrc";
//! }
//!
//! custom_src_impl! {
//!     impl CustomSrcImpl for ZeroSrc {
//!         fn fill(
//!             &self,
//!             _offset: u64,
//!             buffer: &mut gst::BufferRef,
//!         ) -> Result<gst::FlowSuccess, gst::FlowError> {
//!             let mut map = buffer.map_writable().map_err(|_| gst::FlowError::Error)?;
//!             map.fill(0);
//!             Ok(gst::FlowSuccess::Ok)
//!         }
//!     }
//! }
//! ```

use gstreamer as gst;

use crate::config::{ElementMetadata, PadTemplateSpec};

/// Class-level declarations of a custom source.
///
/// One instance of the implementing type is created per element through
/// `Default` and dropped when the element is finalized.
pub trait SubclassInfo: Default + Send + Sync + 'static {
    /// GType name of the subclass. Must be unique within the process.
    const NAME: &'static str;

    /// Element metadata of the class. Defaults to [`ElementMetadata::for_type`].
    fn metadata() -> ElementMetadata {
        ElementMetadata::for_type(Self::NAME)
    }

    /// Template of the single source pad. Defaults to ANY caps.
    fn pad_template() -> PadTemplateSpec {
        PadTemplateSpec::default()
    }
}

/// Optional behaviours of a custom source.
///
/// Only the methods named in [`Self::OVERRIDES`] are wired into the native
/// class; for every other point the base class keeps its own behaviour. The
/// default bodies below describe that behaviour and are what a call through
/// the trait returns for a point that was not overridden.
///
/// Implementations run on GStreamer's streaming threads, hence `Sync`. A
/// panic inside any of them is caught at the native boundary and turned into
/// the point's failure value.
pub trait CustomSrcImpl: SubclassInfo {
    /// Method names of the overridden extension points.
    ///
    /// Generated by [`custom_src_impl!`](crate::custom_src_impl); only set it
    /// by hand when implementing the trait directly.
    const OVERRIDES: &'static [&'static str] = &[];

    fn start(&self) -> bool {
        true
    }

    fn stop(&self) -> bool {
        true
    }

    fn is_seekable(&self) -> bool {
        false
    }

    /// Performs a seek to the start of `segment`.
    fn seek(&self, _segment: &mut gst::Segment) -> bool {
        false
    }

    fn negotiate(&self) -> bool {
        false
    }

    /// Caps this source can produce, optionally intersected with `filter`.
    ///
    /// `None` is answered with empty caps.
    fn caps(&self, _filter: Option<&gst::CapsRef>) -> Option<gst::Caps> {
        None
    }

    fn set_caps(&self, _caps: &gst::Caps) -> bool {
        false
    }

    /// Narrows `caps` in place. Fields left unfixed are fixated with the
    /// native defaults afterwards.
    fn fixate(&self, _caps: &mut gst::CapsRef) {}

    /// Total size of the stream in bytes, `None` when unknown.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Start and end time at which `buffer` should be rendered.
    fn times(&self, _buffer: &gst::BufferRef) -> (Option<gst::ClockTime>, Option<gst::ClockTime>) {
        (None, None)
    }

    /// Inspects an upstream or custom event before the base class does.
    ///
    /// Returning `true` hands the event on to the `GstBaseSrc` handler, which
    /// performs seeks and flushes and decides the final result. Returning
    /// `false` rejects the event.
    fn event(&self, _event: &gst::Event) -> bool {
        true
    }

    /// Fills a buffer allocated by the adapter (or provided by the base
    /// class) with data starting at `offset`.
    fn fill(
        &self,
        _offset: u64,
        _buffer: &mut gst::BufferRef,
    ) -> Result<gst::FlowSuccess, gst::FlowError> {
        Err(gst::FlowError::NotSupported)
    }

    /// Produces a buffer of up to `size` bytes at `offset`. Ownership of the
    /// returned buffer passes to the base class.
    fn create(&self, _offset: u64, _size: u32) -> Result<gst::Buffer, gst::FlowError> {
        Err(gst::FlowError::NotSupported)
    }
}

/// Implements [`CustomSrcImpl`] and records which extension points the impl
/// block overrides.
///
/// The block may only contain extension-point methods; each method name is
/// collected into [`CustomSrcImpl::OVERRIDES`]. A misspelled name or a wrong
/// signature is rejected by the compiler like in any other trait impl.
#[macro_export]
macro_rules! custom_src_impl {
    (
        impl CustomSrcImpl for $ty:ty {
            $(
                $(#[$meta:meta])*
                fn $method:ident ( $($args:tt)* ) $(-> $ret:ty)? $body:block
            )*
        }
    ) => {
        impl $crate::CustomSrcImpl for $ty {
            const OVERRIDES: &'static [&'static str] = &[$(stringify!($method)),*];

            $(
                $(#[$meta])*
                fn $method ( $($args)* ) $(-> $ret)? $body
            )*
        }
    };
}
