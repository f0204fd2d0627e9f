// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests against the real GLib type system.
//!
//! Every test runs in the same process, so each custom source type below is
//! registered at most once and shared between tests through the global
//! registry.

use std::sync::atomic::{AtomicU64, Ordering};

use customsrc::{
    CustomSrcImpl, ElementMetadata, Error, ExtensionPoint, GObjectRegistrar, Registry,
    SubclassInfo, custom_src_impl,
};
use glib::prelude::*;
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_base as gst_base;

static LOG_ONCE: std::sync::Once = std::sync::Once::new();

fn setup() {
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .init();
    });
    gst::init().unwrap();
}

#[derive(Default)]
struct TickSrc {
    filled: AtomicU64,
}

impl SubclassInfo for TickSrc {
    const NAME: &'static str = "CustomSrcTestTickSrc";

    fn metadata() -> ElementMetadata {
        ElementMetadata::new(
            "Tick Source",
            "Source/Test",
            "Produces buffers filled with their sequence number",
            "Contributors to the customsrc project",
        )
    }
}

custom_src_impl! {
    impl CustomSrcImpl for TickSrc {
        fn fill(
            &self,
            offset: u64,
            buffer: &mut gst::BufferRef,
        ) -> Result<gst::FlowSuccess, gst::FlowError> {
            let tick = self.filled.fetch_add(1, Ordering::SeqCst);
            buffer.set_offset(offset);
            let mut map = buffer.map_writable().map_err(|_| gst::FlowError::Error)?;
            map.fill(tick as u8);
            Ok(gst::FlowSuccess::Ok)
        }

        fn is_seekable(&self) -> bool {
            true
        }
    }
}

#[derive(Default)]
struct FlakySrc;

impl SubclassInfo for FlakySrc {
    const NAME: &'static str = "CustomSrcTestFlakySrc";
}

custom_src_impl! {
    impl CustomSrcImpl for FlakySrc {
        fn is_seekable(&self) -> bool {
            panic!("seekability depends on a missing device");
        }

        fn create(&self, _offset: u64, _size: u32) -> Result<gst::Buffer, gst::FlowError> {
            panic!("device went away");
        }
    }
}

#[derive(Default)]
struct SeekWatchSrc {
    events: AtomicU64,
    seeked_to: AtomicU64,
}

impl SubclassInfo for SeekWatchSrc {
    const NAME: &'static str = "CustomSrcTestSeekWatchSrc";
}

custom_src_impl! {
    impl CustomSrcImpl for SeekWatchSrc {
        fn event(&self, _event: &gst::Event) -> bool {
            self.events.fetch_add(1, Ordering::SeqCst);
            true
        }

        fn is_seekable(&self) -> bool {
            true
        }

        fn seek(&self, segment: &mut gst::Segment) -> bool {
            if let Some(start) = segment
                .downcast_ref::<gst::format::Bytes>()
                .and_then(|segment| segment.start())
            {
                self.seeked_to.store(*start, Ordering::SeqCst);
            }
            true
        }

        fn fill(
            &self,
            offset: u64,
            buffer: &mut gst::BufferRef,
        ) -> Result<gst::FlowSuccess, gst::FlowError> {
            buffer.set_offset(offset);
            Ok(gst::FlowSuccess::Ok)
        }
    }
}

fn seekable(element: &gst::Element) -> bool {
    let mut query = gst::query::Seeking::new(gst::Format::Bytes);
    assert!(element.query(&mut query));
    query.result().0
}

fn run_to_end(src: &gst::Element) -> gst::Message {
    let sink = gst::ElementFactory::make("fakesink")
        .property("sync", false)
        .build()
        .unwrap();
    let pipeline = gst::Pipeline::new();
    pipeline.add_many([src, &sink]).unwrap();
    src.link(&sink).unwrap();

    pipeline.set_state(gst::State::Playing).unwrap();
    let msg = pipeline
        .bus()
        .unwrap()
        .timed_pop_filtered(
            gst::ClockTime::from_seconds(10),
            &[gst::MessageType::Eos, gst::MessageType::Error],
        )
        .expect("pipeline did not finish in time");
    pipeline.set_state(gst::State::Null).unwrap();
    msg
}

#[test]
fn element_is_a_base_src_with_declared_metadata() {
    setup();
    let element = Registry::global()
        .create_element::<TickSrc>(Some("tick"))
        .unwrap();

    assert_eq!(element.name(), "tick");
    assert_eq!(element.type_().name(), TickSrc::NAME);
    assert!(element.is::<gst_base::BaseSrc>());
    assert!(element.static_pad("src").is_some());
    assert_eq!(
        element
            .element_class()
            .metadata(gst::ELEMENT_METADATA_LONGNAME),
        Some("Tick Source")
    );
}

#[test]
fn fill_source_runs_to_eos() {
    setup();
    let element = Registry::global().create_element::<TickSrc>(None).unwrap();
    element.set_property("num-buffers", 5i32);

    let msg = run_to_end(&element);
    assert_eq!(msg.type_(), gst::MessageType::Eos);

    let descriptor = Registry::global().lookup::<TickSrc>().unwrap();
    let imp = descriptor.imp_of::<TickSrc>(&element).unwrap();
    assert_eq!(imp.filled.load(Ordering::SeqCst), 5);
}

#[test]
fn overridden_is_seekable_reaches_the_query() {
    setup();
    let element = Registry::global().create_element::<TickSrc>(None).unwrap();
    assert!(seekable(&element));

    let descriptor = Registry::global().get_or_create::<TickSrc>().unwrap();
    assert!(descriptor.has_adapter(ExtensionPoint::IsSeekable));
    assert!(!descriptor.has_adapter(ExtensionPoint::Size));
}

#[test]
fn panicking_overrides_fail_without_unwinding() {
    setup();
    let element = Registry::global().create_element::<FlakySrc>(None).unwrap();
    assert!(!seekable(&element));

    let msg = run_to_end(&element);
    assert_eq!(msg.type_(), gst::MessageType::Error);
}

#[test]
fn imp_of_rejects_foreign_elements() {
    setup();
    let tick = Registry::global().create_element::<TickSrc>(None).unwrap();
    let flaky = Registry::global().create_element::<FlakySrc>(None).unwrap();
    let descriptor = Registry::global().lookup::<TickSrc>().unwrap();

    assert!(descriptor.imp_of::<TickSrc>(&tick).is_some());
    assert!(descriptor.imp_of::<TickSrc>(&flaky).is_none());
    assert!(descriptor.imp_of::<FlakySrc>(&flaky).is_none());
}

#[test]
fn registered_factory_builds_elements() {
    setup();
    let descriptor = Registry::global().get_or_create::<TickSrc>().unwrap();
    descriptor
        .register_element(None, "customsrctestticksrc", gst::Rank::NONE)
        .unwrap();

    let element = gst::ElementFactory::make("customsrctestticksrc")
        .build()
        .unwrap();
    assert_eq!(element.type_(), descriptor.glib_type());
}

#[test]
fn second_registry_cannot_reuse_a_type_name() {
    setup();
    Registry::global().get_or_create::<TickSrc>().unwrap();

    let other = Registry::new(GObjectRegistrar);
    assert_eq!(
        other.get_or_create::<TickSrc>().unwrap_err(),
        Error::TypeNameTaken(TickSrc::NAME.to_owned())
    );
}

#[test]
fn event_override_chains_up_to_the_base_class() {
    setup();
    let src = Registry::global()
        .create_element::<SeekWatchSrc>(None)
        .unwrap();
    let sink = gst::ElementFactory::make("fakesink")
        .property("sync", false)
        .build()
        .unwrap();
    let pipeline = gst::Pipeline::new();
    pipeline.add_many([&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    pipeline.set_state(gst::State::Paused).unwrap();
    pipeline.state(gst::ClockTime::from_seconds(5)).0.unwrap();

    // The seek reaches the base class handler only through the override.
    pipeline
        .seek_simple(gst::SeekFlags::FLUSH, gst::format::Bytes::from_u64(4096))
        .unwrap();
    pipeline.state(gst::ClockTime::from_seconds(5)).0.unwrap();
    pipeline.set_state(gst::State::Null).unwrap();

    let descriptor = Registry::global().lookup::<SeekWatchSrc>().unwrap();
    let imp = descriptor.imp_of::<SeekWatchSrc>(&src).unwrap();
    assert!(imp.events.load(Ordering::SeqCst) >= 1);
    assert_eq!(imp.seeked_to.load(Ordering::SeqCst), 4096);
}

#[test]
fn pull_mode_fills_the_callers_buffer_in_place() {
    setup();
    let element = Registry::global().create_element::<TickSrc>(None).unwrap();
    let pad = element.static_pad("src").unwrap();
    pad.activate_mode(gst::PadMode::Pull, true).unwrap();

    // range_fill fails unless the very buffer passed in comes back.
    let mut buffer = gst::Buffer::with_size(16).unwrap();
    pad.range_fill(64, buffer.get_mut().unwrap(), 16).unwrap();
    pad.activate_mode(gst::PadMode::Pull, false).unwrap();

    assert_eq!(buffer.offset(), 64);
    assert_eq!(buffer.size(), 16);
    let map = buffer.map_readable().unwrap();
    assert!(map.iter().all(|b| *b == map[0]));
}
