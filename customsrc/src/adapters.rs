// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Native-callable adapters, one per extension point.
//!
//! Every adapter is a stateless `extern "C"` trampoline with the exact
//! signature of its `GstBaseSrcClass` slot. It resolves the Rust
//! implementation from the instance struct, runs the override inside
//! `catch_unwind` and converts the outcome into the slot's native result:
//!
//! | kind            | points                                              | on panic                  |
//! |-----------------|-----------------------------------------------------|---------------------------|
//! | boolean         | start, stop, is_seekable, seek, negotiate, set_caps, size, event | `FALSE`      |
//! | flow return     | fill, create                                        | `GST_FLOW_ERROR`          |
//! | output params   | times, fixate                                       | sentinel outputs kept     |
//! | caps            | caps                                                | empty caps                |
//!
//! Buffers and caps produced by an override are moved into native code with
//! `into_glib_ptr()`; the Rust wrapper is consumed at that point and can no
//! longer release the object.

use std::any::Any;
use std::os::raw::c_uint;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use glib::translate::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::{error, trace};

use crate::CustomSrcImpl;
use crate::extension::{ExtensionPoint, NativeSlot};
use crate::native;

type SrcClass = gst_base::ffi::GstBaseSrcClass;
type SrcInstance = gst_base::ffi::GstBaseSrc;

/// An adapter resolved for one subclass: which point it serves, which native
/// slot it occupies, and how to write it into a class structure.
#[derive(Debug, Clone, Copy)]
pub struct Adapter {
    point: ExtensionPoint,
    slot: NativeSlot,
    install: fn(&mut SrcClass),
}

impl Adapter {
    /// Extension point served by this adapter.
    pub fn point(&self) -> ExtensionPoint {
        self.point
    }

    /// Field of `GstBaseSrcClass` the adapter is written into.
    pub fn slot(&self) -> NativeSlot {
        self.slot
    }

    /// Writes the trampoline into its slot of `klass`.
    pub fn install(&self, klass: &mut SrcClass) {
        (self.install)(klass)
    }
}

/// Static mapping from extension point to the slot write for subclass `T`.
pub(crate) fn adapter_for<T: CustomSrcImpl>(point: ExtensionPoint) -> Adapter {
    let install: fn(&mut SrcClass) = match point {
        ExtensionPoint::Start => |klass: &mut SrcClass| klass.start = Some(src_start::<T>),
        ExtensionPoint::Stop => |klass: &mut SrcClass| klass.stop = Some(src_stop::<T>),
        ExtensionPoint::IsSeekable => {
            |klass: &mut SrcClass| klass.is_seekable = Some(src_is_seekable::<T>)
        }
        ExtensionPoint::Seek => |klass: &mut SrcClass| klass.do_seek = Some(src_do_seek::<T>),
        ExtensionPoint::Negotiate => {
            |klass: &mut SrcClass| klass.negotiate = Some(src_negotiate::<T>)
        }
        ExtensionPoint::Caps => |klass: &mut SrcClass| klass.get_caps = Some(src_get_caps::<T>),
        ExtensionPoint::SetCaps => {
            |klass: &mut SrcClass| klass.set_caps = Some(src_set_caps::<T>)
        }
        ExtensionPoint::Fixate => |klass: &mut SrcClass| klass.fixate = Some(src_fixate::<T>),
        ExtensionPoint::Size => |klass: &mut SrcClass| klass.get_size = Some(src_get_size::<T>),
        ExtensionPoint::Times => {
            |klass: &mut SrcClass| klass.get_times = Some(src_get_times::<T>)
        }
        ExtensionPoint::Event => |klass: &mut SrcClass| klass.event = Some(src_event::<T>),
        ExtensionPoint::Fill => |klass: &mut SrcClass| klass.create = Some(src_fill::<T>),
        ExtensionPoint::Create => |klass: &mut SrcClass| klass.create = Some(src_create::<T>),
    };

    Adapter {
        point,
        slot: point.slot(),
        install,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Runs an override, replacing a panic with `fallback`.
fn guarded<R>(point: ExtensionPoint, fallback: R, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            error!(
                extension_point = %point,
                "Override panicked, answering with the failure value: {}",
                panic_message(payload.as_ref())
            );
            fallback
        }
    }
}

pub(crate) fn call_start<T: CustomSrcImpl>(imp: &T) -> bool {
    guarded(ExtensionPoint::Start, false, || imp.start())
}

pub(crate) fn call_stop<T: CustomSrcImpl>(imp: &T) -> bool {
    guarded(ExtensionPoint::Stop, false, || imp.stop())
}

pub(crate) fn call_is_seekable<T: CustomSrcImpl>(imp: &T) -> bool {
    guarded(ExtensionPoint::IsSeekable, false, || imp.is_seekable())
}

pub(crate) fn call_seek<T: CustomSrcImpl>(imp: &T, segment: &mut gst::Segment) -> bool {
    guarded(ExtensionPoint::Seek, false, || imp.seek(segment))
}

pub(crate) fn call_negotiate<T: CustomSrcImpl>(imp: &T) -> bool {
    guarded(ExtensionPoint::Negotiate, false, || imp.negotiate())
}

pub(crate) fn call_caps<T: CustomSrcImpl>(imp: &T, filter: Option<&gst::CapsRef>) -> gst::Caps {
    guarded(ExtensionPoint::Caps, None, || imp.caps(filter)).unwrap_or_else(gst::Caps::new_empty)
}

pub(crate) fn call_set_caps<T: CustomSrcImpl>(imp: &T, caps: &gst::Caps) -> bool {
    guarded(ExtensionPoint::SetCaps, false, || imp.set_caps(caps))
}

pub(crate) fn call_fixate<T: CustomSrcImpl>(imp: &T, mut caps: gst::Caps) -> gst::Caps {
    let incoming = caps.copy();
    let completed = guarded(ExtensionPoint::Fixate, false, || {
        imp.fixate(caps.make_mut());
        true
    });
    if !completed {
        // Edits made before the panic are discarded.
        caps = incoming;
    }
    if !caps.is_any() && !caps.is_fixed() {
        caps.fixate();
    }
    caps
}

pub(crate) fn call_size<T: CustomSrcImpl>(imp: &T) -> Option<u64> {
    guarded(ExtensionPoint::Size, None, || imp.size())
}

pub(crate) fn call_times<T: CustomSrcImpl>(
    imp: &T,
    buffer: &gst::BufferRef,
) -> (Option<gst::ClockTime>, Option<gst::ClockTime>) {
    guarded(ExtensionPoint::Times, (None, None), || imp.times(buffer))
}

pub(crate) fn call_event<T: CustomSrcImpl>(imp: &T, event: &gst::Event) -> bool {
    guarded(ExtensionPoint::Event, false, || imp.event(event))
}

pub(crate) fn call_fill<T: CustomSrcImpl>(
    imp: &T,
    offset: u64,
    buffer: &mut gst::BufferRef,
) -> Result<gst::FlowSuccess, gst::FlowError> {
    guarded(ExtensionPoint::Fill, Err(gst::FlowError::Error), || {
        imp.fill(offset, buffer)
    })
}

/// Allocates a buffer of `size` bytes and lets the override fill it.
pub(crate) fn call_fill_new<T: CustomSrcImpl>(
    imp: &T,
    offset: u64,
    size: u32,
) -> Result<gst::Buffer, gst::FlowError> {
    let mut buffer = gst::Buffer::with_size(size as usize).map_err(|err| {
        error!("Failed to allocate a {} byte buffer: {}", size, err);
        gst::FlowError::Error
    })?;
    {
        let buffer = buffer.get_mut().ok_or(gst::FlowError::Error)?;
        call_fill(imp, offset, buffer)?;
    }
    Ok(buffer)
}

pub(crate) fn call_create<T: CustomSrcImpl>(
    imp: &T,
    offset: u64,
    size: u32,
) -> Result<gst::Buffer, gst::FlowError> {
    guarded(ExtensionPoint::Create, Err(gst::FlowError::Error), || {
        imp.create(offset, size)
    })
}

unsafe extern "C" fn src_start<T: CustomSrcImpl>(ptr: *mut SrcInstance) -> glib::ffi::gboolean {
    match unsafe { native::imp_from_ptr::<T>(ptr) } {
        Some(imp) => call_start(imp).into_glib(),
        None => glib::ffi::GFALSE,
    }
}

unsafe extern "C" fn src_stop<T: CustomSrcImpl>(ptr: *mut SrcInstance) -> glib::ffi::gboolean {
    match unsafe { native::imp_from_ptr::<T>(ptr) } {
        Some(imp) => call_stop(imp).into_glib(),
        None => glib::ffi::GFALSE,
    }
}

unsafe extern "C" fn src_is_seekable<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
) -> glib::ffi::gboolean {
    match unsafe { native::imp_from_ptr::<T>(ptr) } {
        Some(imp) => call_is_seekable(imp).into_glib(),
        None => glib::ffi::GFALSE,
    }
}

unsafe extern "C" fn src_do_seek<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    segment_ptr: *mut gst::ffi::GstSegment,
) -> glib::ffi::gboolean {
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return glib::ffi::GFALSE;
    };

    let mut segment: gst::Segment =
        unsafe { from_glib_none(segment_ptr as *const gst::ffi::GstSegment) };
    let res = call_seek(imp, &mut segment);

    // The base class reads the updated segment back from its own storage.
    let updated: *const gst::ffi::GstSegment = segment.to_glib_none().0;
    unsafe { ptr::copy_nonoverlapping(updated, segment_ptr, 1) };

    res.into_glib()
}

unsafe extern "C" fn src_negotiate<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
) -> glib::ffi::gboolean {
    match unsafe { native::imp_from_ptr::<T>(ptr) } {
        Some(imp) => call_negotiate(imp).into_glib(),
        None => glib::ffi::GFALSE,
    }
}

unsafe extern "C" fn src_get_caps<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    filter: *mut gst::ffi::GstCaps,
) -> *mut gst::ffi::GstCaps {
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return gst::Caps::new_empty().into_glib_ptr();
    };

    let filter = if filter.is_null() {
        None
    } else {
        Some(unsafe { gst::CapsRef::from_ptr(filter) })
    };

    call_caps(imp, filter).into_glib_ptr()
}

unsafe extern "C" fn src_set_caps<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    caps: *mut gst::ffi::GstCaps,
) -> glib::ffi::gboolean {
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return glib::ffi::GFALSE;
    };
    let caps: Borrowed<gst::Caps> = unsafe { from_glib_borrow(caps) };

    call_set_caps(imp, &caps).into_glib()
}

unsafe extern "C" fn src_fixate<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    caps: *mut gst::ffi::GstCaps,
) -> *mut gst::ffi::GstCaps {
    let caps: gst::Caps = unsafe { from_glib_full(caps) };
    match unsafe { native::imp_from_ptr::<T>(ptr) } {
        Some(imp) => call_fixate(imp, caps).into_glib_ptr(),
        None => caps.into_glib_ptr(),
    }
}

unsafe extern "C" fn src_get_size<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    size: *mut u64,
) -> glib::ffi::gboolean {
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return glib::ffi::GFALSE;
    };

    match call_size(imp) {
        Some(value) => {
            unsafe { *size = value };
            glib::ffi::GTRUE
        }
        None => glib::ffi::GFALSE,
    }
}

unsafe extern "C" fn src_get_times<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    buffer: *mut gst::ffi::GstBuffer,
    start: *mut gst::ffi::GstClockTime,
    end: *mut gst::ffi::GstClockTime,
) {
    unsafe {
        *start = gst::ffi::GST_CLOCK_TIME_NONE;
        *end = gst::ffi::GST_CLOCK_TIME_NONE;
    }

    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return;
    };
    let buffer = unsafe { gst::BufferRef::from_ptr(buffer) };
    let (buffer_start, buffer_end) = call_times(imp, buffer);

    unsafe {
        *start = buffer_start.into_glib();
        *end = buffer_end.into_glib();
    }
}

unsafe extern "C" fn src_event<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    event: *mut gst::ffi::GstEvent,
) -> glib::ffi::gboolean {
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return glib::ffi::GFALSE;
    };
    let borrowed: Borrowed<gst::Event> = unsafe { from_glib_borrow(event) };
    if !call_event(imp, &borrowed) {
        return glib::ffi::GFALSE;
    }

    // The parent handler performs seeks and flushes.
    match unsafe { native::parent_src_class(ptr) }.and_then(|klass| klass.event) {
        Some(parent_event) => unsafe { parent_event(ptr, event) },
        None => glib::ffi::GTRUE,
    }
}

unsafe extern "C" fn src_fill<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    offset: u64,
    length: c_uint,
    buffer_ptr: *mut gst::ffi::GstBuffer,
) -> gst::ffi::GstFlowReturn {
    // The sys binding types this argument as `GstBuffer*`; in C it is `GstBuffer**`.
    let buffer_ptr = buffer_ptr as *mut *mut gst::ffi::GstBuffer;
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return gst::FlowReturn::Error.into_glib();
    };

    let provided = unsafe { *buffer_ptr };
    if !provided.is_null() {
        // Buffer from a downstream pool: filled in place, ownership stays with the caller.
        let buffer = unsafe { gst::BufferRef::from_mut_ptr(provided) };
        return gst::FlowReturn::from(call_fill(imp, offset, buffer)).into_glib();
    }

    match call_fill_new(imp, offset, length) {
        Ok(buffer) => {
            trace!("Handing {} byte buffer to the base class", buffer.size());
            unsafe { *buffer_ptr = buffer.into_glib_ptr() };
            gst::FlowReturn::Ok.into_glib()
        }
        Err(err) => gst::FlowReturn::from_error(err).into_glib(),
    }
}

unsafe extern "C" fn src_create<T: CustomSrcImpl>(
    ptr: *mut SrcInstance,
    offset: u64,
    length: c_uint,
    buffer_ptr: *mut gst::ffi::GstBuffer,
) -> gst::ffi::GstFlowReturn {
    // The sys binding types this argument as `GstBuffer*`; in C it is `GstBuffer**`.
    let buffer_ptr = buffer_ptr as *mut *mut gst::ffi::GstBuffer;
    let Some(imp) = (unsafe { native::imp_from_ptr::<T>(ptr) }) else {
        return gst::FlowReturn::Error.into_glib();
    };

    match call_create(imp, offset, length) {
        Ok(buffer) => {
            // If the caller passed in a pool buffer, the base class copies ours into it.
            unsafe { *buffer_ptr = buffer.into_glib_ptr() };
            gst::FlowReturn::Ok.into_glib()
        }
        Err(err) => gst::FlowReturn::from_error(err).into_glib(),
    }
}
