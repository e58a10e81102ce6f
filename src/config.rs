//! Construction-time configuration for a segment writer

use crate::error::{Result, SynapseError};
use crate::header::{FrameGeometry, HEADER_SIZE};

/// Segment name external readers look for by default
pub const DEFAULT_SEGMENT_NAME: &str = "ArgusShm";

/// Default frame geometry (640x480 RGB)
pub const DEFAULT_GEOMETRY: FrameGeometry = FrameGeometry {
    width: 640,
    height: 480,
    channels: 3,
};

/// How the segment's bytes are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentLayout {
    /// No header; the whole capacity is payload
    Raw { capacity: usize },
    /// [`FrameHeader`](crate::header::FrameHeader) followed by one frame of payload
    Frames(FrameGeometry),
}

impl SegmentLayout {
    /// Total segment size in bytes
    pub fn segment_size(&self) -> Result<usize> {
        match *self {
            SegmentLayout::Raw { capacity: 0 } => Err(SynapseError::InvalidCapacity(0)),
            SegmentLayout::Raw { capacity } => Ok(capacity),
            SegmentLayout::Frames(geometry) => geometry.segment_size(),
        }
    }

    /// Offset of the payload region
    #[inline]
    pub fn payload_offset(&self) -> usize {
        match self {
            SegmentLayout::Raw { .. } => 0,
            SegmentLayout::Frames(_) => HEADER_SIZE,
        }
    }
}

/// Writer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Segment name, unique among writers on the host
    pub name: String,
    /// Segment layout
    pub layout: SegmentLayout,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SEGMENT_NAME.to_string(),
            layout: SegmentLayout::Frames(DEFAULT_GEOMETRY),
        }
    }
}

impl WriterConfig {
    pub fn raw(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            layout: SegmentLayout::Raw { capacity },
        }
    }

    pub fn frames(name: impl Into<String>, geometry: FrameGeometry) -> Self {
        Self {
            name: name.into(),
            layout: SegmentLayout::Frames(geometry),
        }
    }
}
