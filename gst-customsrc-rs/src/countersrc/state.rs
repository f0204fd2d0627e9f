// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Settings and runtime state of the counter source.

/// Default first counter value
pub(crate) const DEFAULT_START: u64 = 0;

/// Default number of counters produced (unlimited)
pub(crate) const DEFAULT_LIMIT: Option<u64> = None;

/// Default counter width in bits, used when downstream accepts both
pub(crate) const DEFAULT_WIDTH: i32 = 64;

/// Counter widths in bits the element can produce
pub(crate) const SUPPORTED_WIDTHS: [i32; 2] = [32, 64];

/// Media type of the produced stream
pub(crate) const MEDIA_TYPE: &str = "application/x-customsrc-counter";

/// User-configurable settings for the countersrc element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub start: u64,

    /// Number of counters before EOS, `None` for an endless stream
    pub limit: Option<u64>,

    /// Width in bits picked during fixation when both widths are possible
    pub preferred_width: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            start: DEFAULT_START,
            limit: DEFAULT_LIMIT,
            preferred_width: DEFAULT_WIDTH,
        }
    }
}

/// Runtime state, reset on every start.
#[derive(Debug, Default)]
pub struct State {
    /// Next counter value
    pub next: u64,

    /// Counters produced since start
    pub produced: u64,

    /// Negotiated counter size in bytes
    pub width_bytes: Option<usize>,

    /// Upstream events received since start
    pub events: u64,
}

impl State {
    pub(crate) fn new(settings: &Settings) -> Self {
        State {
            next: settings.start,
            ..Default::default()
        }
    }

    /// Encodes the next counter big-endian in the negotiated width and
    /// advances.
    ///
    /// # Returns
    /// `(index, bytes)`, or `None` if no width was negotiated yet
    pub(crate) fn advance(&mut self) -> Option<(u64, Vec<u8>)> {
        let bytes = match self.width_bytes? {
            4 => (self.next as u32).to_be_bytes().to_vec(),
            _ => self.next.to_be_bytes().to_vec(),
        };
        let index = self.produced;
        self.next = self.next.wrapping_add(1);
        self.produced += 1;
        Some((index, bytes))
    }
}
