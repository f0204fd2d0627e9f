// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Per-class static configuration of a custom source.
//!
//! Every subclass declares its element metadata and its source pad template
//! through [`crate::SubclassInfo`]. Both are validated once at registration
//! time, before anything is handed to the native type system, so that the
//! class-init and base-init hooks never have to deal with invalid input.

use gstreamer as gst;

use crate::{Error, Result};

/// Name of the pad template `GstBaseSrc` looks up when creating its pad.
pub const SRC_TEMPLATE_NAME: &str = "src";

/// Element metadata displayed by `gst-inspect-1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMetadata {
    pub long_name: String,
    pub classification: String,
    pub description: String,
    pub author: String,
}

impl ElementMetadata {
    /// Creates metadata from the four `gst_element_class_set_metadata` fields.
    ///
    /// # Arguments
    ///
    /// * `long_name` - Human readable element name
    /// * `classification` - Slash separated klass, e.g. `Source/Audio`
    /// * `description` - One line description
    /// * `author` - Author name and contact
    pub fn new(long_name: &str, classification: &str, description: &str, author: &str) -> Self {
        Self {
            long_name: long_name.to_owned(),
            classification: classification.to_owned(),
            description: description.to_owned(),
            author: author.to_owned(),
        }
    }

    /// Fallback metadata derived from the registered type name.
    pub fn for_type(type_name: &str) -> Self {
        Self::new(
            type_name,
            "Source",
            "Custom source element",
            "Unknown author",
        )
    }

    /// Checks that every field can be converted into a C string and that the
    /// mandatory fields are not empty.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("long-name", &self.long_name),
            ("klass", &self.classification),
            ("description", &self.description),
            ("author", &self.author),
        ];
        for (key, value) in fields {
            if value.contains('\0') {
                return Err(Error::Metadata(format!("'{key}' contains a NUL byte")));
            }
        }
        if self.long_name.is_empty() || self.classification.is_empty() {
            return Err(Error::Metadata(
                "'long-name' and 'klass' must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Declaration of the source pad template of a custom source.
///
/// `GstBaseSrc` creates its single pad from the class template named
/// [`SRC_TEMPLATE_NAME`], so only the caps are meant to vary between
/// subclasses. `caps: None` means ANY caps.
#[derive(Debug, Clone, PartialEq)]
pub struct PadTemplateSpec {
    pub name: String,
    pub direction: gst::PadDirection,
    pub presence: gst::PadPresence,
    pub caps: Option<gst::Caps>,
}

impl Default for PadTemplateSpec {
    fn default() -> Self {
        Self {
            name: SRC_TEMPLATE_NAME.to_owned(),
            direction: gst::PadDirection::Src,
            presence: gst::PadPresence::Always,
            caps: None,
        }
    }
}

impl PadTemplateSpec {
    /// A source template accepting the given caps.
    pub fn with_caps(caps: gst::Caps) -> Self {
        Self {
            caps: Some(caps),
            ..Default::default()
        }
    }

    /// Builds the native pad template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PadTemplate`] if the declaration does not describe an
    /// always-present source pad named `src`, or if GStreamer rejects it.
    pub fn build(&self) -> Result<gst::PadTemplate> {
        if self.name != SRC_TEMPLATE_NAME
            || self.direction != gst::PadDirection::Src
            || self.presence != gst::PadPresence::Always
        {
            return Err(Error::PadTemplate(format!(
                "base sources need an always-present '{SRC_TEMPLATE_NAME}' source pad, got '{}' ({:?}, {:?})",
                self.name, self.direction, self.presence
            )));
        }

        let caps = self.caps.clone().unwrap_or_else(gst::Caps::new_any);
        gst::PadTemplate::new(&self.name, self.direction, self.presence, &caps)
            .map_err(|err| Error::PadTemplate(err.to_string()))
    }
}
