// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Sample generation for patternsrc.
//!
//! Output is interleaved S16LE. Every sample is a pure function of its
//! absolute index, so any byte offset of the stream can be rendered
//! without state, which is what makes the element seekable.

use gstreamer as gst;

use crate::patternsrc::state::{SAMPLE_SIZE, Settings, Wave};

/// Value of the sample at absolute index `index` for one channel.
pub(crate) fn sample_at(settings: &Settings, index: u64) -> i16 {
    if settings.rate == 0 || settings.frequency == 0 {
        return 0;
    }

    let amplitude = (settings.volume.clamp(0.0, 1.0) * f64::from(i16::MAX)) as i64;
    let rate = u64::from(settings.rate);
    // Position inside the current period, in units of 1/rate periods.
    let phase = (index % rate) * u64::from(settings.frequency) % rate;

    let value = match settings.wave {
        Wave::Silence => 0,
        Wave::Square => {
            if phase < rate / 2 {
                amplitude
            } else {
                -amplitude
            }
        }
        Wave::Saw => -amplitude + (2 * amplitude * phase as i64) / rate as i64,
    };
    value as i16
}

/// Renders frames into `data`, starting at frame `first_frame`.
///
/// Trailing bytes that do not form a whole frame are zeroed.
///
/// # Returns
/// Number of whole frames written
pub(crate) fn render(settings: &Settings, first_frame: u64, data: &mut [u8]) -> u64 {
    let bpf = settings.bytes_per_frame() as usize;
    let mut frames = 0;

    let mut chunks = data.chunks_exact_mut(bpf);
    for (i, frame) in chunks.by_ref().enumerate() {
        let bytes = sample_at(settings, first_frame + i as u64).to_le_bytes();
        for sample in frame.chunks_exact_mut(SAMPLE_SIZE as usize) {
            sample.copy_from_slice(&bytes);
        }
        frames += 1;
    }
    chunks.into_remainder().fill(0);

    frames
}

/// Running time of frame `frame` at `rate` Hz.
pub(crate) fn frames_to_time(frame: u64, rate: u32) -> gst::ClockTime {
    if rate == 0 {
        return gst::ClockTime::ZERO;
    }
    let nseconds = u128::from(frame) * u128::from(gst::ClockTime::SECOND.nseconds()) / u128::from(rate);
    gst::ClockTime::from_nseconds(nseconds as u64)
}
