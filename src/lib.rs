//! Synapse - named shared memory segments for streaming frames between processes
//!
//! One writer process creates a named OS shared memory segment, maps it and
//! publishes data into it; any number of external readers map the same name
//! and poll it.
//!
//! # Layouts
//!
//! - **Raw**: no header, the caller owns every byte of the segment.
//! - **Frames**: a 16-byte [`FrameHeader`] (`frame_id`, `width`, `height`,
//!   `channels`) followed by one frame of payload. [`SharedSegmentWriter::write_frame`]
//!   copies the payload and then bumps `frame_id` with release ordering.
//!
//! # Reader protocol
//!
//! Load `frame_id` (acquire), copy the payload, load `frame_id` again; if both
//! loads match the copy is consistent, otherwise retry.
//!
//! ```no_run
//! use synapse_memory::SharedSegmentWriter;
//!
//! let mut writer = SharedSegmentWriter::create_frames("ArgusShm", 640, 480, 3)?;
//! let frame = vec![0u8; 640 * 480 * 3];
//! writer.write_frame(&frame)?;
//! # Ok::<(), synapse_memory::SynapseError>(())
//! ```

pub mod config;
pub mod error;
pub mod header;
pub mod shm;
pub mod writer;

pub use config::{SegmentLayout, WriterConfig, DEFAULT_SEGMENT_NAME};
pub use error::{Result, SynapseError};
pub use header::{FrameGeometry, FrameHeader, HEADER_SIZE};
pub use shm::remove_segment;
pub use writer::{SegmentOrigin, SharedSegmentWriter};
