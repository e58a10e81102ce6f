//! Frame header stored at offset 0 of a structured segment
//!
//! ```text
//! offset  field     type
//! 0       frame_id  u32 (atomic, bumped after each payload copy)
//! 4       width     u32
//! 8       height    u32
//! 12      channels  u32
//! 16      payload   [u8; width * height * channels]
//! ```
//!
//! Fields use the host's native byte order; writer and reader must agree on it.

use crate::error::{Result, SynapseError};
use std::sync::atomic::{AtomicU32, Ordering};

/// Size of [`FrameHeader`] in bytes, and offset of the payload region
pub const HEADER_SIZE: usize = std::mem::size_of::<FrameHeader>();

const _: () = assert!(HEADER_SIZE == 16);
const _: () = assert!(std::mem::align_of::<FrameHeader>() == 4);

/// Payload geometry: one byte per channel sample, row-major
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl FrameGeometry {
    /// Validate and build a geometry
    ///
    /// Every dimension must be non-zero and the total segment size must fit in `usize`.
    pub fn new(width: u32, height: u32, channels: u32) -> Result<Self> {
        let geometry = Self {
            width,
            height,
            channels,
        };
        geometry.segment_size()?;
        Ok(geometry)
    }

    /// Number of payload bytes for one frame
    pub fn payload_len(&self) -> Result<usize> {
        let invalid = || SynapseError::InvalidGeometry {
            width: self.width,
            height: self.height,
            channels: self.channels,
        };

        if self.width == 0 || self.height == 0 || self.channels == 0 {
            return Err(invalid());
        }

        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.channels as usize))
            .ok_or_else(invalid)
    }

    /// Header plus payload
    pub fn segment_size(&self) -> Result<usize> {
        self.payload_len()?
            .checked_add(HEADER_SIZE)
            .ok_or(SynapseError::InvalidGeometry {
                width: self.width,
                height: self.height,
                channels: self.channels,
            })
    }
}

/// Header layout shared with out-of-process readers
#[repr(C)]
pub struct FrameHeader {
    /// Change-detection token: starts at 0, wraps at 2^32
    frame_id: AtomicU32,
    width: u32,
    height: u32,
    channels: u32,
}

impl FrameHeader {
    /// Write a fresh header with `frame_id = 0`
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `HEADER_SIZE` bytes and 4-byte aligned.
    pub unsafe fn init(ptr: *mut Self, geometry: FrameGeometry) {
        ptr.write(Self {
            frame_id: AtomicU32::new(0),
            width: geometry.width,
            height: geometry.height,
            channels: geometry.channels,
        });
    }

    /// Current frame counter, paired with the writer's release increment
    #[inline(always)]
    pub fn frame_id(&self) -> u32 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// Publish a frame whose payload is already in place
    ///
    /// Returns the new counter value.
    #[inline]
    pub(crate) fn publish(&self) -> u32 {
        self.frame_id.fetch_add(1, Ordering::Release).wrapping_add(1)
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry {
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }
}
