// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Runs the plugin's elements in real pipelines.

use std::sync::{Arc, Mutex};

use gst::prelude::*;
use gstcustomsrc::{countersrc, patternsrc};
use gstreamer as gst;

static LOG_ONCE: std::sync::Once = std::sync::Once::new();

fn init() {
    LOG_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .init();
        gst::init().unwrap();
        gstcustomsrc::plugin_register_static().unwrap();
    });
}

/// Links `src` to a fakesink, runs the pipeline until EOS or error and
/// returns the final message plus every buffer that reached the sink.
fn run(src: &gst::Element) -> (gst::Message, Vec<gst::Buffer>) {
    let sink = gst::ElementFactory::make("fakesink")
        .property("sync", false)
        .property("signal-handoffs", true)
        .build()
        .unwrap();

    let buffers = Arc::new(Mutex::new(Vec::new()));
    {
        let buffers = buffers.clone();
        sink.connect("handoff", false, move |args| {
            let buffer = args[1].get::<gst::Buffer>().unwrap();
            buffers.lock().unwrap().push(buffer);
            None
        });
    }

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

    let buffers = buffers.lock().unwrap().clone();
    (msg, buffers)
}

#[test]
fn factories_are_registered() {
    init();
    for name in [patternsrc::ELEMENT_NAME, countersrc::ELEMENT_NAME] {
        let factory = gst::ElementFactory::find(name).unwrap();
        assert_eq!(factory.rank(), gst::Rank::NONE);
    }

    let factory = gst::ElementFactory::find(patternsrc::ELEMENT_NAME).unwrap();
    assert_eq!(
        factory.metadata(gst::ELEMENT_METADATA_KLASS),
        Some("Source/Audio")
    );
}

#[test]
fn limited_pattern_stops_at_its_size() {
    init();
    let src = gst::ElementFactory::make(patternsrc::ELEMENT_NAME)
        .property("blocksize", 400u32)
        .build()
        .unwrap();
    assert!(patternsrc::configure(
        &src,
        patternsrc::Settings {
            rate: 8_000,
            num_samples: Some(1_000),
            ..Default::default()
        }
    ));

    let (msg, buffers) = run(&src);
    assert_eq!(msg.type_(), gst::MessageType::Eos);

    // 1000 mono S16LE samples in 400 byte blocks: 200 + 200 + 200 + 200 + 200 frames.
    assert_eq!(buffers.len(), 5);
    assert_eq!(buffers[0].pts(), Some(gst::ClockTime::ZERO));
    assert_eq!(buffers[4].pts(), Some(gst::ClockTime::from_mseconds(100)));
    let total: usize = buffers.iter().map(|b| b.size()).sum();
    assert_eq!(total, 2_000);
}

#[test]
fn pattern_caps_follow_settings() {
    init();
    let src = gst::ElementFactory::make(patternsrc::ELEMENT_NAME)
        .build()
        .unwrap();
    patternsrc::configure(
        &src,
        patternsrc::Settings {
            channels: 2,
            rate: 16_000,
            ..Default::default()
        },
    );

    let caps = src.static_pad("src").unwrap().query_caps(None);
    let info = gstreamer_audio::AudioInfo::from_caps(&caps).unwrap();
    assert_eq!(info.channels(), 2);
    assert_eq!(info.rate(), 16_000);
    assert_eq!(info.format(), gstreamer_audio::AudioFormat::S16le);
}

#[test]
fn counters_reach_the_sink_in_the_negotiated_width() {
    init();
    let src = gst::ElementFactory::make(countersrc::ELEMENT_NAME)
        .build()
        .unwrap();
    countersrc::configure(
        &src,
        countersrc::Settings {
            start: 7,
            limit: Some(3),
            preferred_width: 32,
        },
    );

    let (msg, buffers) = run(&src);
    assert_eq!(msg.type_(), gst::MessageType::Eos);
    assert_eq!(countersrc::produced(&src), Some(3));

    let values: Vec<u32> = buffers
        .iter()
        .map(|b| {
            let map = b.map_readable().unwrap();
            u32::from_be_bytes(map.as_slice().try_into().unwrap())
        })
        .collect();
    assert_eq!(values, [7, 8, 9]);
}

#[test]
fn configure_rejects_other_elements() {
    init();
    let counter = gst::ElementFactory::make(countersrc::ELEMENT_NAME)
        .build()
        .unwrap();
    assert!(!patternsrc::configure(&counter, patternsrc::Settings::default()));
    assert!(patternsrc::settings(&counter).is_none());
    assert!(countersrc::settings(&counter).is_some());
}

#[test]
fn byte_seek_repositions_the_pattern() {
    init();
    let src = gst::ElementFactory::make(patternsrc::ELEMENT_NAME)
        .property("blocksize", 400u32)
        .build()
        .unwrap();
    patternsrc::configure(
        &src,
        patternsrc::Settings {
            rate: 8_000,
            ..Default::default()
        },
    );
    let sink = gst::ElementFactory::make("fakesink")
        .property("sync", false)
        .build()
        .unwrap();

    let pipeline = gst::Pipeline::new();
    pipeline.add_many([&src, &sink]).unwrap();
    src.link(&sink).unwrap();

    let buffers = Arc::new(Mutex::new(Vec::new()));
    {
        let buffers = buffers.clone();
        src.static_pad("src")
            .unwrap()
            .add_probe(gst::PadProbeType::BUFFER, move |_, info| {
                if let Some(gst::PadProbeData::Buffer(buffer)) = &info.data {
                    buffers.lock().unwrap().push(buffer.clone());
                }
                gst::PadProbeReturn::Ok
            })
            .unwrap();
    }

    pipeline.set_state(gst::State::Paused).unwrap();
    pipeline.state(gst::ClockTime::from_seconds(5)).0.unwrap();
    // The sink holds the preroll buffer, so nothing else is pushed until the seek.
    buffers.lock().unwrap().clear();

    // Byte 16000 of mono S16LE at 8 kHz is frame 8000, one second in.
    pipeline
        .seek_simple(gst::SeekFlags::FLUSH, gst::format::Bytes::from_u64(16_000))
        .unwrap();
    pipeline.state(gst::ClockTime::from_seconds(5)).0.unwrap();

    let first = buffers.lock().unwrap().first().cloned();
    pipeline.set_state(gst::State::Null).unwrap();

    let first = first.expect("no buffer after the seek");
    assert_eq!(first.offset(), 8_000);
    assert_eq!(first.offset_end(), 8_200);
    assert_eq!(first.pts(), Some(gst::ClockTime::from_seconds(1)));
}
