// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Extension points and override detection.
//!
//! An extension point is an optional behaviour of a base source that a
//! subclass may customise. Each one corresponds to a default method of
//! [`crate::CustomSrcImpl`] and targets exactly one slot of the native
//! `GstBaseSrcClass` structure.
//!
//! Method signatures are checked by the compiler, so detection only has to
//! decide *which* points a type customised. That list is recorded in
//! [`crate::CustomSrcImpl::OVERRIDES`] (generated by
//! [`crate::custom_src_impl!`] from the methods written in the impl block)
//! and resolved here into the adapter set installed into the class.

use std::collections::BTreeMap;
use std::fmt;

use crate::adapters::{self, Adapter};
use crate::{CustomSrcImpl, Error, Result};

/// Optional behaviours a custom source may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionPoint {
    Start,
    Stop,
    IsSeekable,
    Seek,
    Negotiate,
    Caps,
    SetCaps,
    Fixate,
    Size,
    Times,
    Event,
    Fill,
    Create,
}

/// Fields of `GstBaseSrcClass` an adapter can be written into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeSlot {
    Start,
    Stop,
    IsSeekable,
    DoSeek,
    Negotiate,
    GetCaps,
    SetCaps,
    Fixate,
    GetSize,
    GetTimes,
    Event,
    Create,
}

impl ExtensionPoint {
    /// Every extension point, in slot table order.
    pub const ALL: [ExtensionPoint; 13] = [
        ExtensionPoint::Start,
        ExtensionPoint::Stop,
        ExtensionPoint::IsSeekable,
        ExtensionPoint::Seek,
        ExtensionPoint::Negotiate,
        ExtensionPoint::Caps,
        ExtensionPoint::SetCaps,
        ExtensionPoint::Fixate,
        ExtensionPoint::Size,
        ExtensionPoint::Times,
        ExtensionPoint::Event,
        ExtensionPoint::Fill,
        ExtensionPoint::Create,
    ];

    /// Name of the trait method implementing this point.
    pub fn method_name(self) -> &'static str {
        match self {
            ExtensionPoint::Start => "start",
            ExtensionPoint::Stop => "stop",
            ExtensionPoint::IsSeekable => "is_seekable",
            ExtensionPoint::Seek => "seek",
            ExtensionPoint::Negotiate => "negotiate",
            ExtensionPoint::Caps => "caps",
            ExtensionPoint::SetCaps => "set_caps",
            ExtensionPoint::Fixate => "fixate",
            ExtensionPoint::Size => "size",
            ExtensionPoint::Times => "times",
            ExtensionPoint::Event => "event",
            ExtensionPoint::Fill => "fill",
            ExtensionPoint::Create => "create",
        }
    }

    /// Looks up the point implemented by trait method `name`.
    ///
    /// # Returns
    ///
    /// `None` if `name` is not an extension point method
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|point| point.method_name() == name)
    }

    /// The native slot this point's adapter is installed into.
    ///
    /// `Fill` and `Create` share the `create` slot: a fill override gets a
    /// buffer allocated on its behalf and handed to the base class.
    pub fn slot(self) -> NativeSlot {
        match self {
            ExtensionPoint::Start => NativeSlot::Start,
            ExtensionPoint::Stop => NativeSlot::Stop,
            ExtensionPoint::IsSeekable => NativeSlot::IsSeekable,
            ExtensionPoint::Seek => NativeSlot::DoSeek,
            ExtensionPoint::Negotiate => NativeSlot::Negotiate,
            ExtensionPoint::Caps => NativeSlot::GetCaps,
            ExtensionPoint::SetCaps => NativeSlot::SetCaps,
            ExtensionPoint::Fixate => NativeSlot::Fixate,
            ExtensionPoint::Size => NativeSlot::GetSize,
            ExtensionPoint::Times => NativeSlot::GetTimes,
            ExtensionPoint::Event => NativeSlot::Event,
            ExtensionPoint::Fill | ExtensionPoint::Create => NativeSlot::Create,
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

impl NativeSlot {
    /// Field name in the C `GstBaseSrcClass` structure.
    pub fn field_name(self) -> &'static str {
        match self {
            NativeSlot::Start => "start",
            NativeSlot::Stop => "stop",
            NativeSlot::IsSeekable => "is_seekable",
            NativeSlot::DoSeek => "do_seek",
            NativeSlot::Negotiate => "negotiate",
            NativeSlot::GetCaps => "get_caps",
            NativeSlot::SetCaps => "set_caps",
            NativeSlot::Fixate => "fixate",
            NativeSlot::GetSize => "get_size",
            NativeSlot::GetTimes => "get_times",
            NativeSlot::Event => "event",
            NativeSlot::Create => "create",
        }
    }
}

impl fmt::Display for NativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Resolves the adapters to install for `T`.
///
/// Every name in `T::OVERRIDES` must be the method name of an extension
/// point. Repeated names are collapsed. Two different points targeting the
/// same native slot are rejected, because only one of them could be
/// installed.
///
/// # Errors
///
/// - [`Error::UnknownExtensionPoint`] for a name that is not an extension point
/// - [`Error::ConflictingOverrides`] for two points sharing a slot
pub fn find_overrides<T: CustomSrcImpl>() -> Result<BTreeMap<ExtensionPoint, Adapter>> {
    let mut installed: BTreeMap<ExtensionPoint, Adapter> = BTreeMap::new();
    let mut slots: BTreeMap<NativeSlot, ExtensionPoint> = BTreeMap::new();

    for name in T::OVERRIDES {
        let point = ExtensionPoint::from_method_name(name)
            .ok_or_else(|| Error::UnknownExtensionPoint((*name).to_owned()))?;
        if installed.contains_key(&point) {
            continue;
        }
        if let Some(existing) = slots.insert(point.slot(), point) {
            return Err(Error::ConflictingOverrides {
                first: existing.method_name(),
                second: point.method_name(),
                slot: point.slot().field_name(),
            });
        }
        installed.insert(point, adapters::adapter_for::<T>(point));
    }

    Ok(installed)
}
