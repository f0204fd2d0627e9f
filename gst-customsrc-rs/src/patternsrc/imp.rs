// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Pattern source implementation.
//!
//! Overrides `fill`, so buffers are allocated by the adapter in the size the
//! base class asks for (`blocksize`, in bytes) and only have to be written.
//! The base class runs in bytes format: the byte offset of every buffer
//! identifies its first frame, seeking in bytes needs no work here, and a
//! limited stream reports its size so that the base class stops at the end.

use std::sync::{LazyLock, Mutex};

use customsrc::{ElementMetadata, PadTemplateSpec, SubclassInfo, custom_src_impl};
use gstreamer as gst;
use gstreamer_audio as gst_audio;

use crate::patternsrc::render;
use crate::patternsrc::state::Settings;

/// GStreamer debug category for logging patternsrc-specific messages
pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "patternsrc",
        gst::DebugColorFlags::empty(),
        Some("Pattern Source"),
    )
});

/// Pattern source element implementation.
#[derive(Default)]
pub struct PatternSrc {
    settings: Mutex<Settings>,

    /// Format agreed on in the last `set_caps`. Rate and channel count of
    /// the rendered audio come from here, not from the settings.
    info: Mutex<Option<gst_audio::AudioInfo>>,
}

impl PatternSrc {
    pub(crate) fn settings(&self) -> Settings {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    pub(crate) fn set_settings(&self, settings: Settings) {
        match self.settings.lock() {
            Ok(mut current) => {
                gst::info!(CAT, "Changing settings from {:?} to {:?}", *current, settings);
                *current = settings;
            }
            Err(_) => gst::error!(CAT, "Settings mutex poisoned, settings ignored"),
        }
    }

    /// Settings to render with: the pattern from the current settings, the
    /// format from the negotiated caps.
    fn render_settings(&self) -> Result<Settings, gst::FlowError> {
        let info = self
            .info
            .lock()
            .map_err(|_| gst::FlowError::Error)?
            .clone()
            .ok_or_else(|| {
                gst::error!(CAT, "Fill called before caps were negotiated");
                gst::FlowError::NotNegotiated
            })?;

        Ok(Settings {
            rate: info.rate(),
            channels: info.channels(),
            ..self.settings()
        })
    }
}

impl SubclassInfo for PatternSrc {
    const NAME: &'static str = "GstRsPatternSrc";

    fn metadata() -> ElementMetadata {
        ElementMetadata::new(
            "Pattern Source",
            "Source/Audio",
            "Generates periodic audio test patterns",
            "Contributors to the customsrc project",
        )
    }

    fn pad_template() -> PadTemplateSpec {
        PadTemplateSpec::with_caps(
            gst_audio::AudioCapsBuilder::new_interleaved()
                .format(gst_audio::AudioFormat::S16le)
                .build(),
        )
    }
}

custom_src_impl! {
    impl CustomSrcImpl for PatternSrc {
        fn start(&self) -> bool {
            let settings = self.settings();
            if let Err(err) = settings.audio_info() {
                gst::error!(CAT, "Invalid settings {:?}: {}", settings, err);
                return false;
            }
            gst::info!(
                CAT,
                "Starting {} wave at {} Hz ({} Hz, {} channel(s))",
                settings.wave,
                settings.frequency,
                settings.rate,
                settings.channels
            );
            true
        }

        fn is_seekable(&self) -> bool {
            true
        }

        fn seek(&self, segment: &mut gst::Segment) -> bool {
            // Content only depends on the byte offset of the next buffer.
            let seekable = segment.format() == gst::Format::Bytes;
            gst::debug!(CAT, "Seek to {:?}: {}", segment.start(), seekable);
            seekable
        }

        fn caps(&self, filter: Option<&gst::CapsRef>) -> Option<gst::Caps> {
            let caps = match self.settings().audio_info().and_then(|info| info.to_caps()) {
                Ok(caps) => caps,
                Err(err) => {
                    gst::warning!(CAT, "No caps for current settings: {}", err);
                    return None;
                }
            };

            Some(match filter {
                Some(filter) => filter.intersect_with_mode(&caps, gst::CapsIntersectMode::First),
                None => caps,
            })
        }

        fn set_caps(&self, caps: &gst::Caps) -> bool {
            let info = match gst_audio::AudioInfo::from_caps(caps) {
                Ok(info) => info,
                Err(err) => {
                    gst::error!(CAT, "Unusable caps {}: {}", caps, err);
                    return false;
                }
            };
            gst::debug!(CAT, "Negotiated {}", caps);

            match self.info.lock() {
                Ok(mut current) => {
                    *current = Some(info);
                    true
                }
                Err(_) => false,
            }
        }

        fn size(&self) -> Option<u64> {
            self.settings().size()
        }

        fn times(
            &self,
            buffer: &gst::BufferRef,
        ) -> (Option<gst::ClockTime>, Option<gst::ClockTime>) {
            let end = buffer
                .pts()
                .zip(buffer.duration())
                .map(|(pts, duration)| pts + duration);
            (buffer.pts(), end)
        }

        fn fill(
            &self,
            offset: u64,
            buffer: &mut gst::BufferRef,
        ) -> Result<gst::FlowSuccess, gst::FlowError> {
            let settings = self.render_settings()?;
            let bpf = settings.bytes_per_frame();
            let first_frame = offset / bpf;

            let frames = {
                let mut map = buffer.map_writable().map_err(|err| {
                    gst::error!(CAT, "Failed to map buffer writable: {}", err);
                    gst::FlowError::Error
                })?;
                render::render(&settings, first_frame, &mut map)
            };

            let pts = render::frames_to_time(first_frame, settings.rate);
            let end = render::frames_to_time(first_frame + frames, settings.rate);
            buffer.set_pts(pts);
            buffer.set_duration(end - pts);
            buffer.set_offset(first_frame);
            buffer.set_offset_end(first_frame + frames);

            gst::trace!(CAT, "Rendered {} frame(s) at {}", frames, pts);
            Ok(gst::FlowSuccess::Ok)
        }
    }
}
