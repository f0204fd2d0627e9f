// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Native type registration.
//!
//! A custom source is registered as a static GObject type derived from
//! `GstBaseSrc`. The instance struct extends `GstBaseSrc` with a pointer to
//! the boxed Rust implementation; the class struct extends
//! `GstBaseSrcClass` with the parent class pointer needed to chain up in
//! `finalize` and `event`.

use std::ffi::CString;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use glib::gobject_ffi;
use glib::prelude::*;
use glib::translate::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::{debug, error};

use crate::adapters::Adapter;
use crate::config::ElementMetadata;
use crate::{CustomSrcImpl, Error, Result};

type BaseInitFn = unsafe extern "C" fn(glib::ffi::gpointer);
type ClassInitFn = unsafe extern "C" fn(glib::ffi::gpointer, glib::ffi::gpointer);
type InstanceInitFn = unsafe extern "C" fn(*mut gobject_ffi::GTypeInstance, glib::ffi::gpointer);

/// Instance layout of every custom source.
#[repr(C)]
pub(crate) struct CustomSrcInstance<T> {
    parent: gst_base::ffi::GstBaseSrc,
    imp: *mut T,
}

/// Class layout of every custom source.
#[repr(C)]
pub(crate) struct CustomSrcClass {
    parent: gst_base::ffi::GstBaseSrcClass,
    parent_class: *const gobject_ffi::GObjectClass,
}

/// Data handed to class-init. Lives for the rest of the process once the
/// type is registered.
pub(crate) struct ClassData {
    long_name: CString,
    classification: CString,
    description: CString,
    author: CString,
    adapters: Vec<Adapter>,
}

impl ClassData {
    pub(crate) fn new(metadata: &ElementMetadata, adapters: Vec<Adapter>) -> Result<Self> {
        let c = |value: &str| {
            CString::new(value).map_err(|err| Error::Metadata(err.to_string()))
        };
        Ok(Self {
            long_name: c(&metadata.long_name)?,
            classification: c(&metadata.classification)?,
            description: c(&metadata.description)?,
            author: c(&metadata.author)?,
            adapters,
        })
    }
}

/// Opaque handle to a registered native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(glib::ffi::GType);

impl TypeHandle {
    /// The handle as a [`glib::Type`].
    pub fn glib_type(&self) -> glib::Type {
        unsafe { from_glib(self.0) }
    }
}

impl From<glib::Type> for TypeHandle {
    fn from(type_: glib::Type) -> Self {
        TypeHandle(type_.into_glib())
    }
}

/// Everything the native type system needs to register one custom source.
pub struct NativeTypeInfo {
    pub name: String,
    pub parent: glib::Type,
    pub class_size: u16,
    pub instance_size: u16,
    pub base_init: BaseInitFn,
    pub class_init: ClassInitFn,
    pub instance_init: InstanceInitFn,
    pub(crate) class_data: *const ClassData,
}

impl NativeTypeInfo {
    /// Type info for `T` with the hooks monomorphised for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutTooLarge`] if a struct size does not fit the
    /// 16 bit fields of `GTypeInfo`.
    pub(crate) fn for_subclass<T: CustomSrcImpl>(class_data: *const ClassData) -> Result<Self> {
        let size = |bytes: usize| {
            u16::try_from(bytes).map_err(|_| Error::LayoutTooLarge(T::NAME.to_owned()))
        };
        Ok(Self {
            name: T::NAME.to_owned(),
            parent: gst_base::BaseSrc::static_type(),
            class_size: size(mem::size_of::<CustomSrcClass>())?,
            instance_size: size(mem::size_of::<CustomSrcInstance<T>>())?,
            base_init: base_init::<T>,
            class_init: class_init::<T>,
            instance_init: instance_init::<T>,
            class_data,
        })
    }
}

/// Registers native types. Swappable so that registration can be observed
/// without touching the process-wide GLib type table.
pub trait TypeRegistrar: Send + Sync {
    /// Registers `info` permanently and returns the new type.
    ///
    /// # Errors
    ///
    /// - [`Error::TypeNameTaken`] if the name is already known
    /// - [`Error::RegistrationFailed`] if the type system refuses the type
    fn register_static(&self, info: &NativeTypeInfo) -> Result<TypeHandle>;
}

/// [`TypeRegistrar`] backed by `g_type_register_static`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GObjectRegistrar;

impl TypeRegistrar for GObjectRegistrar {
    fn register_static(&self, info: &NativeTypeInfo) -> Result<TypeHandle> {
        let name =
            CString::new(info.name.as_str()).map_err(|_| Error::InvalidTypeName(info.name.clone()))?;

        unsafe {
            if gobject_ffi::g_type_from_name(name.as_ptr()) != 0 {
                return Err(Error::TypeNameTaken(info.name.clone()));
            }

            let type_info = gobject_ffi::GTypeInfo {
                class_size: info.class_size,
                base_init: Some(info.base_init),
                base_finalize: None,
                class_init: Some(info.class_init),
                class_finalize: None,
                class_data: info.class_data as glib::ffi::gconstpointer,
                instance_size: info.instance_size,
                n_preallocs: 0,
                instance_init: Some(info.instance_init),
                value_table: ptr::null(),
            };

            let type_ = gobject_ffi::g_type_register_static(
                info.parent.into_glib(),
                name.as_ptr(),
                &type_info,
                0,
            );
            if type_ == 0 {
                return Err(Error::RegistrationFailed(info.name.clone()));
            }

            debug!("Registered native type '{}' ({:#x})", info.name, type_);
            Ok(TypeHandle(type_))
        }
    }
}

/// Checks a type name against the GLib naming rules: at least three
/// characters, starting with a letter or `_`, followed by letters, digits
/// or `-_+`.
pub fn validate_type_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = name.len() >= 3
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTypeName(name.to_owned()))
    }
}

/// Resolves the Rust implementation behind a native instance pointer.
///
/// # Safety
///
/// `ptr` must be null or point to an instance of a type registered for `T`.
pub(crate) unsafe fn imp_from_ptr<'a, T>(ptr: *mut gst_base::ffi::GstBaseSrc) -> Option<&'a T> {
    if ptr.is_null() {
        return None;
    }
    let instance = ptr as *const CustomSrcInstance<T>;
    unsafe { (*instance).imp.as_ref() }
}

/// Class structure of the parent type of the instance behind `ptr`.
///
/// # Safety
///
/// `ptr` must point to an instance of a type registered through this module.
pub(crate) unsafe fn parent_src_class<'a>(
    ptr: *mut gst_base::ffi::GstBaseSrc,
) -> Option<&'a gst_base::ffi::GstBaseSrcClass> {
    if ptr.is_null() {
        return None;
    }
    unsafe {
        let klass = (*(ptr as *mut gobject_ffi::GTypeInstance)).g_class as *const CustomSrcClass;
        ((*klass).parent_class as *const gst_base::ffi::GstBaseSrcClass).as_ref()
    }
}

unsafe extern "C" fn base_init<T: CustomSrcImpl>(klass: glib::ffi::gpointer) {
    let templ = match panic::catch_unwind(|| T::pad_template().build()) {
        Ok(Ok(templ)) => templ,
        Ok(Err(err)) => {
            error!("No pad template for '{}': {}", T::NAME, err);
            return;
        }
        Err(_) => {
            error!("Pad template declaration of '{}' panicked", T::NAME);
            return;
        }
    };

    unsafe {
        gst::ffi::gst_element_class_add_pad_template(
            klass as *mut gst::ffi::GstElementClass,
            templ.to_glib_none().0,
        );
    }
}

unsafe extern "C" fn class_init<T: CustomSrcImpl>(
    klass: glib::ffi::gpointer,
    class_data: glib::ffi::gpointer,
) {
    let data = unsafe { &*(class_data as *const ClassData) };
    let custom_klass = unsafe { &mut *(klass as *mut CustomSrcClass) };

    unsafe {
        custom_klass.parent_class =
            gobject_ffi::g_type_class_peek_parent(klass) as *const gobject_ffi::GObjectClass;

        let gobject_klass = &mut *(klass as *mut gobject_ffi::GObjectClass);
        gobject_klass.finalize = Some(finalize::<T>);

        gst::ffi::gst_element_class_set_metadata(
            klass as *mut gst::ffi::GstElementClass,
            data.long_name.as_ptr(),
            data.classification.as_ptr(),
            data.description.as_ptr(),
            data.author.as_ptr(),
        );
    }

    for adapter in &data.adapters {
        adapter.install(&mut custom_klass.parent);
    }
    debug!(
        "Class '{}' initialised with {} adapter(s)",
        T::NAME,
        data.adapters.len()
    );
}

unsafe extern "C" fn instance_init<T: CustomSrcImpl>(
    instance: *mut gobject_ffi::GTypeInstance,
    _klass: glib::ffi::gpointer,
) {
    let instance = instance as *mut CustomSrcInstance<T>;
    // A null implementation turns every adapter call into its failure value.
    let imp = match panic::catch_unwind(T::default) {
        Ok(imp) => Box::into_raw(Box::new(imp)),
        Err(_) => {
            error!("Default construction of '{}' panicked", T::NAME);
            ptr::null_mut()
        }
    };
    unsafe { ptr::write(&raw mut (*instance).imp, imp) };
}

unsafe extern "C" fn finalize<T: CustomSrcImpl>(obj: *mut gobject_ffi::GObject) {
    unsafe {
        let instance = obj as *mut CustomSrcInstance<T>;
        let imp = mem::replace(&mut (*instance).imp, ptr::null_mut());
        if !imp.is_null() {
            let boxed = Box::from_raw(imp);
            if panic::catch_unwind(AssertUnwindSafe(move || drop(boxed))).is_err() {
                error!("Dropping the implementation of '{}' panicked", T::NAME);
            }
        }

        let klass = (*(obj as *mut gobject_ffi::GTypeInstance)).g_class as *const CustomSrcClass;
        let parent_class = (*klass).parent_class;
        if let Some(parent_finalize) = parent_class.as_ref().and_then(|k| k.finalize) {
            parent_finalize(obj);
        }
    }
}

/// Takes back class data that was never handed to a registered type.
///
/// # Safety
///
/// `data` must come from `Box::into_raw` and must not be referenced by any
/// registered type.
pub(crate) unsafe fn reclaim_class_data(data: *const ClassData) {
    drop(unsafe { Box::from_raw(data as *mut ClassData) });
}
