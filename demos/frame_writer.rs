//! Example Frame Writer
//!
//! Streams a synthetic moving gradient into a frame segment, once per loop
//! iteration, the way a render loop would. Shared memory is a side channel:
//! if the segment cannot be created or a frame is rejected, the loop keeps
//! running and only logs.
//!
//! Run with `RUST_LOG=debug` for per-frame output.

use clap::Parser;
use std::thread;
use std::time::{Duration, Instant};
use synapse_memory::{FrameGeometry, SharedSegmentWriter, WriterConfig, DEFAULT_SEGMENT_NAME};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frame_writer")]
#[command(about = "Publish synthetic frames to a shared memory segment", long_about = None)]
struct Args {
    /// Segment name
    #[arg(short, long, default_value = DEFAULT_SEGMENT_NAME)]
    name: String,

    #[arg(long, default_value = "640")]
    width: u32,

    #[arg(long, default_value = "480")]
    height: u32,

    /// Bytes per pixel
    #[arg(long, default_value = "3")]
    channels: u32,

    /// Target loop rate
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Stop after this many iterations (0 = run forever)
    #[arg(long, default_value = "0")]
    frames: u64,
}

/// Diagonal gradient scrolling with `tick`, one byte per channel sample
fn render(frame: &mut [u8], geometry: FrameGeometry, tick: u64) {
    let width = geometry.width as usize;
    let channels = geometry.channels as usize;

    for (i, pixel) in frame.chunks_exact_mut(channels).enumerate() {
        let (x, y) = (i % width, i / width);
        let base = (x + y) as u64 + tick;
        for (c, sample) in pixel.iter_mut().enumerate() {
            *sample = (base + c as u64 * 85) as u8;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let geometry = match FrameGeometry::new(args.width, args.height, args.channels) {
        Ok(g) => g,
        Err(e) => {
            error!(error = %e, "invalid frame geometry");
            std::process::exit(2);
        }
    };

    let config = WriterConfig::frames(&args.name, geometry);
    let mut writer = match SharedSegmentWriter::create(&config) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "shared memory unavailable, running without it");
            None
        }
    };

    // payload_len cannot fail once the geometry validated
    let mut frame = vec![0u8; geometry.payload_len().unwrap_or(0)];
    let period = Duration::from_secs(1) / args.fps.max(1);
    let mut last_report = Instant::now();
    let mut tick = 0u64;

    info!(name = %args.name, fps = args.fps, "entering main loop");

    while args.frames == 0 || tick < args.frames {
        let started = Instant::now();

        render(&mut frame, geometry, tick);

        if let Some(writer) = writer.as_mut() {
            match writer.write_frame(&frame) {
                Ok(id) => debug!(frame_id = id, "frame published"),
                Err(e) => warn!(error = %e, "frame dropped"),
            }
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let frame_id = writer.as_ref().and_then(|w| w.frame_id());
            info!(?frame_id, "status");
            last_report = Instant::now();
        }

        tick += 1;
        if let Some(rest) = period.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }

    info!(frames = tick, "shutting down");
}
