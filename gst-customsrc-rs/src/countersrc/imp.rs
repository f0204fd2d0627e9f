// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Counter source implementation.
//!
//! Overrides `create` and allocates every buffer itself. The counter width
//! is negotiated through the `width` caps field: `caps` offers both widths,
//! `fixate` narrows to the preferred one and `set_caps` records the result.

use std::sync::{LazyLock, Mutex};

use customsrc::{ElementMetadata, PadTemplateSpec, SubclassInfo, custom_src_impl};
use gstreamer as gst;

use crate::countersrc::state::{MEDIA_TYPE, SUPPORTED_WIDTHS, Settings, State};

/// GStreamer debug category for logging countersrc-specific messages
pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "countersrc",
        gst::DebugColorFlags::empty(),
        Some("Counter Source"),
    )
});

/// Counter source element implementation.
#[derive(Default)]
pub struct CounterSrc {
    settings: Mutex<Settings>,
    state: Mutex<State>,
}

impl CounterSrc {
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

    /// Number of counters produced since the last start.
    pub(crate) fn produced(&self) -> u64 {
        self.state.lock().map(|state| state.produced).unwrap_or(0)
    }

    /// Number of upstream events received since the last start.
    pub(crate) fn events(&self) -> u64 {
        self.state.lock().map(|state| state.events).unwrap_or(0)
    }

    fn all_caps() -> gst::Caps {
        gst::Caps::builder(MEDIA_TYPE)
            .field("width", gst::List::new(SUPPORTED_WIDTHS))
            .build()
    }
}

impl SubclassInfo for CounterSrc {
    const NAME: &'static str = "GstRsCounterSrc";

    fn metadata() -> ElementMetadata {
        ElementMetadata::new(
            "Counter Source",
            "Source",
            "Produces one big-endian counter per buffer",
            "Contributors to the customsrc project",
        )
    }

    fn pad_template() -> PadTemplateSpec {
        PadTemplateSpec::with_caps(Self::all_caps())
    }
}

custom_src_impl! {
    impl CustomSrcImpl for CounterSrc {
        fn start(&self) -> bool {
            let settings = self.settings();
            match self.state.lock() {
                Ok(mut state) => {
                    *state = State::new(&settings);
                    gst::info!(CAT, "Counting from {} (limit {:?})", settings.start, settings.limit);
                    true
                }
                Err(_) => {
                    gst::error!(CAT, "State mutex poisoned");
                    false
                }
            }
        }

        fn stop(&self) -> bool {
            match self.state.lock() {
                Ok(state) => {
                    gst::info!(
                        CAT,
                        "Stopped after {} counter(s) and {} event(s)",
                        state.produced,
                        state.events
                    );
                    true
                }
                Err(_) => false,
            }
        }

        fn caps(&self, filter: Option<&gst::CapsRef>) -> Option<gst::Caps> {
            let caps = Self::all_caps();
            Some(match filter {
                Some(filter) => filter.intersect_with_mode(&caps, gst::CapsIntersectMode::First),
                None => caps,
            })
        }

        fn fixate(&self, caps: &mut gst::CapsRef) {
            let preferred = self.settings().preferred_width;
            if let Some(s) = caps.structure_mut(0) {
                s.fixate_field_nearest_int("width", preferred);
            }
        }

        fn set_caps(&self, caps: &gst::Caps) -> bool {
            let width = caps
                .structure(0)
                .filter(|s| s.has_name(MEDIA_TYPE))
                .and_then(|s| s.get::<i32>("width").ok());

            let width_bytes = match width {
                Some(bits) if SUPPORTED_WIDTHS.contains(&bits) => bits as usize / 8,
                _ => {
                    gst::error!(CAT, "Unsupported caps {}", caps);
                    return false;
                }
            };

            match self.state.lock() {
                Ok(mut state) => {
                    gst::debug!(CAT, "Producing {} byte counters", width_bytes);
                    state.width_bytes = Some(width_bytes);
                    true
                }
                Err(_) => false,
            }
        }

        fn event(&self, event: &gst::Event) -> bool {
            if let Ok(mut state) = self.state.lock() {
                state.events += 1;
            }
            gst::debug!(CAT, "Received {:?} event", event.type_());
            // Counters cannot be repositioned.
            event.type_() != gst::EventType::Seek
        }

        fn create(&self, _offset: u64, _size: u32) -> Result<gst::Buffer, gst::FlowError> {
            let limit = self.settings().limit;
            let mut state = self.state.lock().map_err(|_| {
                gst::error!(CAT, "State mutex poisoned");
                gst::FlowError::Error
            })?;

            if limit.is_some_and(|limit| state.produced >= limit) {
                gst::debug!(CAT, "Limit of {} counter(s) reached", state.produced);
                return Err(gst::FlowError::Eos);
            }

            let (index, bytes) = state.advance().ok_or_else(|| {
                gst::error!(CAT, "Create called before caps were negotiated");
                gst::FlowError::NotNegotiated
            })?;

            let mut buffer = gst::Buffer::from_mut_slice(bytes);
            {
                let buffer = buffer.get_mut().ok_or(gst::FlowError::Error)?;
                buffer.set_offset(index);
                buffer.set_offset_end(index + 1);
            }

            gst::trace!(CAT, "Produced counter #{}", index);
            Ok(buffer)
        }
    }
}
