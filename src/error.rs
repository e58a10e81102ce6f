//! Error types for Synapse

use std::io;
use thiserror::Error;

/// Result type for Synapse operations
pub type Result<T> = std::result::Result<T, SynapseError>;

/// Errors that can occur while managing a shared segment
#[derive(Debug, Error)]
pub enum SynapseError {
    /// The segment could not be created, and no existing object could be opened instead
    #[error("Failed to create shared memory '{name}': {source}")]
    SegmentCreateFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to open an existing shared memory object
    #[error("Failed to open shared memory '{name}': {source}")]
    SegmentOpenFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    /// An object under the same name already existed at creation time.
    ///
    /// Never returned from construction: the writer logs it and falls back to
    /// opening the existing object.
    #[error("Shared memory '{name}' already exists (stale segment or concurrent creator)")]
    SegmentRemoveRace { name: String },

    /// Failed to remove a named segment
    #[error("Failed to remove shared memory '{name}': {source}")]
    SegmentRemove {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to truncate shared memory
    #[error("Failed to set shared memory size: {0}")]
    Truncate(#[source] io::Error),

    /// Payload does not fit in the payload region
    #[error("Payload too large: max {max} bytes, got {got} bytes")]
    PayloadTooLarge { max: usize, got: usize },

    /// Frame operation on a segment created without a frame header
    #[error("Segment '{0}' has a raw layout and no frame header")]
    RawLayout(String),

    /// Whole-segment mutable access on a segment whose header must stay intact
    #[error("Segment '{0}' has a frame header; only the payload region is writable")]
    FramesLayout(String),

    /// Frame geometry is zero in some dimension or overflows the address space
    #[error("Invalid frame geometry {width}x{height} ({channels} ch)")]
    InvalidGeometry {
        width: u32,
        height: u32,
        channels: u32,
    },

    /// Raw capacity must be non-zero
    #[error("Invalid segment capacity: {0} bytes")]
    InvalidCapacity(usize),

    /// Name is empty or contains a forbidden character
    #[error("Invalid segment name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Name too long for the OS namespace
    #[error("Segment name too long: max {max} chars, got {got}")]
    NameTooLong { max: usize, got: usize },
}
