// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// A media event that remembers the object it originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEvent<S> {
    source: S,
}

impl<S> MediaEvent<S> {
    /// Creates an event originating from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the event and returns its source.
    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: fmt::Display> fmt::Display for MediaEvent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaEvent[source={}]", self.source)
    }
}
