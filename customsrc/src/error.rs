// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for subclass registration and element construction.
//!
//! Only registration and construction can fail with an [`Error`]. Failures
//! inside an overridden extension point never surface here: the adapters
//! convert them into the native result value of that point.

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while registering or instantiating a custom source.
///
/// The enum is `Clone` because a failed registration is cached by the
/// [`crate::Registry`] and handed out again on every later request for the
/// same class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `CustomSrcImpl::OVERRIDES` names a method that is not an extension point.
    #[error("Unknown extension point '{0}'")]
    UnknownExtensionPoint(String),

    /// Two overridden extension points target the same native slot.
    #[error("Extension points '{first}' and '{second}' both target the native '{slot}' slot")]
    ConflictingOverrides {
        first: &'static str,
        second: &'static str,
        slot: &'static str,
    },

    /// The type name is not acceptable to the GLib type system.
    #[error("Invalid type name '{0}'")]
    InvalidTypeName(String),

    /// A type with this name is already registered with GLib.
    #[error("Type name '{0}' is already registered")]
    TypeNameTaken(String),

    /// The native type system refused the registration.
    #[error("Native type registration failed for '{0}'")]
    RegistrationFailed(String),

    /// The class layout does not fit into the native type-info block.
    #[error("Class or instance size of '{0}' exceeds the native limit")]
    LayoutTooLarge(String),

    /// The declared pad template could not be built.
    #[error("Invalid pad template: {0}")]
    PadTemplate(String),

    /// The declared element metadata cannot be passed to native code.
    #[error("Invalid element metadata: {0}")]
    Metadata(String),

    /// The registered type could not be instantiated as an element.
    #[error("Failed to create element: {0}")]
    ElementCreation(String),

    /// The requested class has not been registered.
    #[error("Type '{0}' is not registered")]
    NotRegistered(&'static str),

    /// A class-level declaration of the subclass panicked during registration.
    #[error("Declaring '{declaration}' of '{name}' panicked")]
    DeclarationPanicked {
        name: &'static str,
        declaration: &'static str,
    },
}
