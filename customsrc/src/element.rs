// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Registered subclasses and the elements built from them.

use std::any::TypeId;
use std::collections::BTreeMap;

use glib::prelude::*;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;
use tracing::debug;

use crate::adapters::Adapter;
use crate::config::ElementMetadata;
use crate::extension::ExtensionPoint;
use crate::native::{self, TypeHandle};
use crate::{CustomSrcImpl, Error, Result};

/// Everything known about one registered custom source class.
///
/// Built once by the [`crate::Registry`] and never modified afterwards. The
/// native type it describes stays registered for the lifetime of the
/// process.
#[derive(Debug)]
pub struct SubclassDescriptor {
    type_handle: TypeHandle,
    rust_type: TypeId,
    name: &'static str,
    metadata: ElementMetadata,
    pad_template: gst::PadTemplate,
    adapters: BTreeMap<ExtensionPoint, Adapter>,
}

impl SubclassDescriptor {
    pub(crate) fn new<T: CustomSrcImpl>(
        type_handle: TypeHandle,
        metadata: ElementMetadata,
        pad_template: gst::PadTemplate,
        adapters: BTreeMap<ExtensionPoint, Adapter>,
    ) -> Self {
        Self {
            type_handle,
            rust_type: TypeId::of::<T>(),
            name: T::NAME,
            metadata,
            pad_template,
            adapters,
        }
    }

    /// Handle of the registered native type.
    pub fn type_handle(&self) -> TypeHandle {
        self.type_handle
    }

    /// The registered type as a [`glib::Type`], e.g. for
    /// `glib::Object::builder_with_type` or `is_a` checks.
    pub fn glib_type(&self) -> glib::Type {
        self.type_handle.glib_type()
    }

    /// GType name the class was registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Element metadata set on the class during class-init.
    pub fn metadata(&self) -> &ElementMetadata {
        &self.metadata
    }

    /// Template of the `src` pad, as added to the class during base-init.
    pub fn pad_template(&self) -> &gst::PadTemplate {
        &self.pad_template
    }

    /// Whether an adapter was installed for `point`. Points without one
    /// keep the native base class behaviour.
    pub fn has_adapter(&self, point: ExtensionPoint) -> bool {
        self.adapters.contains_key(&point)
    }

    /// Installed adapters, ordered by extension point.
    pub fn adapters(&self) -> impl Iterator<Item = &Adapter> {
        self.adapters.values()
    }

    /// Writes every adapter into `klass`. This is what class-init does for
    /// the registered type.
    pub fn install_into(&self, klass: &mut gst_base::ffi::GstBaseSrcClass) {
        for adapter in self.adapters.values() {
            adapter.install(klass);
        }
    }

    /// Creates a new element of this class.
    ///
    /// # Arguments
    ///
    /// * `name` - Optional element name, GStreamer picks a unique one when `None`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementCreation`] if the object could not be built
    /// or is not an element.
    pub fn instantiate(&self, name: Option<&str>) -> Result<gst::Element> {
        let mut builder = glib::Object::builder_with_type(self.glib_type());
        if let Some(name) = name {
            builder = builder.property("name", name);
        }
        let object = builder.build();
        let element = object.downcast::<gst::Element>().map_err(|object| {
            Error::ElementCreation(format!(
                "'{}' is a {}, not an element",
                self.name,
                object.type_()
            ))
        })?;

        debug!("Created element '{}' of type '{}'", element.name(), self.name);
        Ok(element)
    }

    /// Registers this class as element factory `factory_name` in `plugin`.
    ///
    /// # Arguments
    ///
    /// * `plugin` - Plugin to register with, `None` for a static registration
    /// * `factory_name` - Name used with `gst::ElementFactory::make`
    /// * `rank` - Autoplugging rank of the factory
    ///
    /// # Returns
    ///
    /// The error from `gst::Element::register` if the factory could not be added
    pub fn register_element(
        &self,
        plugin: Option<&gst::Plugin>,
        factory_name: &str,
        rank: gst::Rank,
    ) -> std::result::Result<(), glib::BoolError> {
        gst::Element::register(plugin, factory_name, rank, self.glib_type())
    }

    /// Returns the Rust implementation behind `element`, if the element is
    /// an instance of this class and the class was registered for `T`.
    pub fn imp_of<'a, T: CustomSrcImpl>(&self, element: &'a gst::Element) -> Option<&'a T> {
        if self.rust_type != TypeId::of::<T>() || !element.type_().is_a(self.glib_type()) {
            return None;
        }
        unsafe { native::imp_from_ptr::<T>(element.as_ptr() as *mut gst_base::ffi::GstBaseSrc) }
    }
}
