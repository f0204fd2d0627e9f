// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Custom GStreamer source elements implemented in Rust.
//!
//! A custom source is a plain Rust type implementing [`SubclassInfo`] and
//! [`CustomSrcImpl`]. The [`Registry`] turns it into a native `GstBaseSrc`
//! subclass the first time it is needed:
//!
//! 1. the overridden extension points are resolved ([`extension`]),
//! 2. one native adapter per overridden point is selected ([`adapters`]),
//! 3. a static GObject type is registered whose class-init writes those
//!    adapters into the `GstBaseSrcClass` slots ([`native`]).
//!
//! Points a type does not override keep the base class behaviour. Elements
//! are then created through [`SubclassDescriptor::instantiate`] or by
//! registering the class as an element factory in a plugin.

pub mod adapters;
pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod extension;
pub mod native;
pub mod registry;
pub mod subclass;

pub use config::{ElementMetadata, PadTemplateSpec};
pub use element::SubclassDescriptor;
pub use error::{Error, Result};
pub use event::MediaEvent;
pub use extension::{ExtensionPoint, NativeSlot, find_overrides};
pub use native::{GObjectRegistrar, NativeTypeInfo, TypeHandle, TypeRegistrar};
pub use registry::Registry;
pub use subclass::{CustomSrcImpl, SubclassInfo};
