// SPDX-FileCopyrightText: 2025 Contributors to the customsrc project.
// SPDX-License-Identifier: Apache-2.0

//! Runs one of the plugin's sources into a sink until EOS.
//!
//! ```bash
//! cargo run --example launch -- pattern --wave saw --samples 48000 --sink autoaudiosink
//! cargo run --example launch -- counter --limit 5 --width 32
//! ```

use std::error::Error;

use clap::{Parser, Subcommand};
use customsrc::MediaEvent;
use gst::prelude::*;
use gstcustomsrc::{countersrc, patternsrc};
use gstreamer as gst;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "launch")]
#[command(about = "Run a custom source element into a sink", long_about = None)]
struct Cli {
    #[command(subcommand)]
    source: Source,

    /// Sink element factory
    #[arg(long, default_value = "fakesink")]
    sink: String,

    /// Stop after this many buffers
    #[arg(long)]
    num_buffers: Option<i32>,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Periodic audio test pattern
    Pattern {
        /// silence, square or saw
        #[arg(long, default_value = "square")]
        wave: patternsrc::Wave,

        #[arg(long, default_value_t = 440)]
        frequency: u32,

        #[arg(long, default_value_t = 0.8)]
        volume: f64,

        #[arg(long, default_value_t = 48_000)]
        rate: u32,

        #[arg(long, default_value_t = 1)]
        channels: u32,

        /// Samples per channel before EOS
        #[arg(long)]
        samples: Option<u64>,
    },
    /// Big-endian counters
    Counter {
        #[arg(long, default_value_t = 0)]
        start: u64,

        #[arg(long)]
        limit: Option<u64>,

        /// Counter width in bits (32 or 64)
        #[arg(long, default_value_t = 64)]
        width: i32,
    },
}

fn make_source(source: Source) -> Result<gst::Element, Box<dyn Error>> {
    let element = match source {
        Source::Pattern {
            wave,
            frequency,
            volume,
            rate,
            channels,
            samples,
        } => {
            let element = gst::ElementFactory::make(patternsrc::ELEMENT_NAME).build()?;
            patternsrc::configure(
                &element,
                patternsrc::Settings {
                    wave,
                    frequency,
                    volume,
                    rate,
                    channels,
                    num_samples: samples,
                },
            );
            element
        }
        Source::Counter {
            start,
            limit,
            width,
        } => {
            let element = gst::ElementFactory::make(countersrc::ELEMENT_NAME).build()?;
            countersrc::configure(
                &element,
                countersrc::Settings {
                    start,
                    limit,
                    preferred_width: width,
                },
            );
            element
        }
    };
    Ok(element)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    gst::init()?;
    gstcustomsrc::plugin_register_static()?;

    let src = make_source(cli.source)?;
    if let Some(num_buffers) = cli.num_buffers {
        src.set_property("num-buffers", num_buffers);
    }
    let sink = gst::ElementFactory::make(&cli.sink).build()?;

    let pipeline = gst::Pipeline::new();
    pipeline.add_many([&src, &sink])?;
    src.link(&sink)?;

    pipeline.set_state(gst::State::Playing)?;
    info!("Running {} into {}", src.name(), sink.name());

    let bus = pipeline.bus().ok_or("pipeline without bus")?;
    for msg in bus.iter_timed(gst::ClockTime::NONE) {
        use gst::MessageView;

        match msg.view() {
            MessageView::Eos(..) => {
                let source = msg
                    .src()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default();
                info!("{}", MediaEvent::new(source));
                break;
            }
            MessageView::Error(err) => {
                warn!(
                    "Error from {:?}: {} ({:?})",
                    err.src().map(|s| s.path_string()),
                    err.error(),
                    err.debug()
                );
                break;
            }
            _ => (),
        }
    }

    pipeline.set_state(gst::State::Null)?;
    Ok(())
}
