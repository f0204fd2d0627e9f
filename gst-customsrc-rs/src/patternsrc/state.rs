// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Settings of the pattern source.

use std::fmt;
use std::str::FromStr;

use gst::glib;
use gstreamer as gst;
use gstreamer_audio as gst_audio;

/// Default sample rate in Hz
pub(crate) const DEFAULT_RATE: u32 = 48_000;

/// Default number of interleaved channels
pub(crate) const DEFAULT_CHANNELS: u32 = 1;

/// Default pattern frequency in Hz
pub(crate) const DEFAULT_FREQUENCY: u32 = 440;

/// Default amplitude, relative to full scale
pub(crate) const DEFAULT_VOLUME: f64 = 0.8;

/// Default stream length (unlimited)
pub(crate) const DEFAULT_NUM_SAMPLES: Option<u64> = None;

/// Bytes per sample of the produced S16LE audio
pub(crate) const SAMPLE_SIZE: u64 = 2;

/// Shape of the generated signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Silence,
    #[default]
    Square,
    Saw,
}

impl FromStr for Wave {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silence" => Ok(Wave::Silence),
            "square" => Ok(Wave::Square),
            "saw" => Ok(Wave::Saw),
            other => Err(format!("unknown wave '{other}'")),
        }
    }
}

impl fmt::Display for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Wave::Silence => "silence",
            Wave::Square => "square",
            Wave::Saw => "saw",
        })
    }
}

/// User-configurable settings for the patternsrc element.
///
/// Applied with [`super::configure`]; changes take effect for the next
/// buffer, caps changes after the next negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub wave: Wave,

    /// Pattern frequency in Hz
    pub frequency: u32,

    /// Amplitude in `0.0..=1.0`
    pub volume: f64,

    pub rate: u32,

    pub channels: u32,

    /// Total number of samples per channel, `None` for an endless stream
    pub num_samples: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            wave: Wave::default(),
            frequency: DEFAULT_FREQUENCY,
            volume: DEFAULT_VOLUME,
            rate: DEFAULT_RATE,
            channels: DEFAULT_CHANNELS,
            num_samples: DEFAULT_NUM_SAMPLES,
        }
    }
}

impl Settings {
    /// Size of one frame (one sample for every channel) in bytes.
    pub fn bytes_per_frame(&self) -> u64 {
        SAMPLE_SIZE * u64::from(self.channels.max(1))
    }

    /// Stream size in bytes, if the stream is limited.
    pub fn size(&self) -> Option<u64> {
        self.num_samples.map(|n| n * self.bytes_per_frame())
    }

    pub fn audio_info(&self) -> Result<gst_audio::AudioInfo, glib::BoolError> {
        gst_audio::AudioInfo::builder(gst_audio::AudioFormat::S16le, self.rate, self.channels)
            .build()
    }
}
