//! Example Raw Writer
//!
//! Creates a headerless segment and, each iteration, fills its first 100
//! bytes with a rotating value. Readers map the name and watch byte 0 change.

use clap::Parser;
use std::thread;
use std::time::Duration;
use synapse_memory::{SharedSegmentWriter, DEFAULT_SEGMENT_NAME};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FILL_LEN: usize = 100;

#[derive(Parser)]
#[command(name = "raw_writer")]
#[command(
    about = "Write a rotating byte pattern into a raw shared memory segment",
    long_about = None
)]
struct Args {
    /// Segment name
    #[arg(short, long, default_value = DEFAULT_SEGMENT_NAME)]
    name: String,

    /// Segment size in bytes
    #[arg(short, long, default_value = "1024")]
    capacity: usize,

    /// Target loop rate
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Stop after this many iterations (0 = run forever)
    #[arg(long, default_value = "0")]
    frames: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut writer = match SharedSegmentWriter::create_raw(&args.name, args.capacity) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "shared memory unavailable, running without it");
            None
        }
    };

    let period = Duration::from_secs(1) / args.fps.max(1);
    let mut value = 0u8;
    let mut tick = 0u64;

    while args.frames == 0 || tick < args.frames {
        if let Some(buf) = writer.as_mut().and_then(|w| w.buffer_mut().ok()) {
            let len = FILL_LEN.min(buf.len());
            buf[..len].fill(value);
        }

        if tick % u64::from(args.fps.max(1)) == 0 {
            info!(value, "status");
        }

        value = value.wrapping_add(1);
        tick += 1;
        thread::sleep(period);
    }
}
