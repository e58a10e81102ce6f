//! Single-writer side of a named shared segment
//!
//! The writer owns the segment from creation to teardown. In frame layout it
//! keeps a [`FrameHeader`] at offset 0 and publishes payloads by copying them
//! in and then bumping `frame_id` with release ordering, so a reader that
//! loads `frame_id` with acquire ordering, copies the payload and re-checks
//! `frame_id` gets a consistent snapshot. No lock is taken.

use crate::config::{SegmentLayout, WriterConfig};
use crate::error::{Result, SynapseError};
use crate::header::{FrameGeometry, FrameHeader, HEADER_SIZE};
use crate::shm::{Ownership, PlatformSegment, SegmentBackend, SegmentName};
use std::slice;
use tracing::{debug, info, warn};

/// How the writer came to hold its segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOrigin {
    /// Freshly created under the name
    Created,
    /// An object already existed and was opened instead
    Opened,
}

/// Owner of one named shared segment and its mapping
///
/// Dropping the writer unmaps the segment, closes the OS handle and removes
/// the name, so the next run starts from a fresh segment.
pub struct SharedSegmentWriter<B: SegmentBackend = PlatformSegment> {
    segment: B,
    name: String,
    layout: SegmentLayout,
    origin: SegmentOrigin,
}

impl SharedSegmentWriter {
    /// Create a writer from a configuration
    pub fn create(config: &WriterConfig) -> Result<Self> {
        Self::create_in(config)
    }

    /// Create a raw segment of exactly `capacity` bytes, no header
    pub fn create_raw(name: &str, capacity: usize) -> Result<Self> {
        Self::create_in(&WriterConfig::raw(name, capacity))
    }

    /// Create a frame segment sized `HEADER_SIZE + width * height * channels`
    pub fn create_frames(name: &str, width: u32, height: u32, channels: u32) -> Result<Self> {
        let geometry = FrameGeometry::new(width, height, channels)?;
        Self::create_in(&WriterConfig::frames(name, geometry))
    }
}

impl<B: SegmentBackend> SharedSegmentWriter<B> {
    /// Create a writer on a specific backend
    ///
    /// Removes any stale object under the name first. If creation still finds
    /// the name taken, the existing object is opened and taken over instead.
    pub fn create_in(config: &WriterConfig) -> Result<Self> {
        let name = SegmentName::new(&config.name)?;
        let len = config.layout.segment_size()?;

        match B::remove(&name) {
            Ok(true) => warn!(name = %name, "removed stale shared memory segment"),
            Ok(false) => {}
            Err(e) => warn!(name = %name, error = %e, "failed to remove stale segment"),
        }

        let (segment, origin) = match B::create_exclusive(&name, len) {
            Ok(segment) => (segment, SegmentOrigin::Created),
            Err(race @ SynapseError::SegmentRemoveRace { .. }) => {
                warn!(error = %race, "opening existing segment instead");
                let segment = B::open_existing(&name, len, Ownership::Owner).map_err(|e| {
                    match e {
                        SynapseError::SegmentOpenFailed { name, source } => {
                            SynapseError::SegmentCreateFailed { name, source }
                        }
                        other => other,
                    }
                })?;
                (segment, SegmentOrigin::Opened)
            }
            Err(e) => return Err(e),
        };

        let base = segment.as_ptr();
        unsafe {
            // An opened object may still hold a previous run's bytes.
            std::ptr::write_bytes(base, 0, len);
            if let SegmentLayout::Frames(geometry) = config.layout {
                FrameHeader::init(base.cast::<FrameHeader>(), geometry);
            }
        }

        match config.layout {
            SegmentLayout::Frames(g) => info!(
                name = %name,
                width = g.width,
                height = g.height,
                channels = g.channels,
                capacity = len,
                ?origin,
                "segment active"
            ),
            SegmentLayout::Raw { .. } => {
                info!(name = %name, capacity = len, ?origin, "segment active (raw)")
            }
        }

        Ok(Self {
            segment,
            name: config.name.clone(),
            layout: config.layout,
            origin,
        })
    }

    /// The whole mapped region, header included
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.segment.as_ptr(), self.capacity()) }
    }

    /// Mutable view of the whole mapped region of a raw segment
    ///
    /// Frame segments keep their header out of reach and return
    /// [`SynapseError::FramesLayout`]; use [`payload_mut`](Self::payload_mut) there.
    #[inline]
    pub fn buffer_mut(&mut self) -> Result<&mut [u8]> {
        match self.layout {
            SegmentLayout::Raw { .. } => Ok(self.payload_mut()),
            SegmentLayout::Frames(_) => Err(SynapseError::FramesLayout(self.name.clone())),
        }
    }

    /// Mutable view of the payload region, for rendering in place
    ///
    /// Never covers the frame header. Follow with
    /// [`commit_frame`](Self::commit_frame) in frame layout.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let offset = self.layout.payload_offset();
        let len = self.capacity() - offset;
        unsafe { slice::from_raw_parts_mut(self.segment.as_ptr().add(offset), len) }
    }

    /// Copy `payload` to the start of the payload region and publish it
    ///
    /// Bytes past `payload.len()` keep their previous contents. Returns the
    /// new frame counter. An oversized payload is rejected before anything is
    /// written.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<u32> {
        let header = self.header_or_err()?;
        let max = self.payload_capacity();
        if payload.len() > max {
            return Err(SynapseError::PayloadTooLarge {
                max,
                got: payload.len(),
            });
        }

        unsafe {
            std::ptr::copy_nonoverlapping(
                payload.as_ptr(),
                self.segment.as_ptr().add(HEADER_SIZE),
                payload.len(),
            );
        }

        Ok(header.publish())
    }

    /// Publish a frame rendered through [`payload_mut`](Self::payload_mut)
    pub fn commit_frame(&mut self) -> Result<u32> {
        Ok(self.header_or_err()?.publish())
    }

    /// Current frame counter, or `None` for a raw segment
    #[inline]
    pub fn frame_id(&self) -> Option<u32> {
        self.header().map(FrameHeader::frame_id)
    }

    /// The frame header, or `None` for a raw segment
    #[inline]
    pub fn header(&self) -> Option<&FrameHeader> {
        match self.layout {
            SegmentLayout::Frames(_) => {
                Some(unsafe { &*self.segment.as_ptr().cast::<FrameHeader>() })
            }
            SegmentLayout::Raw { .. } => None,
        }
    }

    fn header_or_err(&self) -> Result<&FrameHeader> {
        self.header().ok_or_else(|| SynapseError::RawLayout(self.name.clone()))
    }

    /// Frame geometry, or `None` for a raw segment
    pub fn geometry(&self) -> Option<FrameGeometry> {
        match self.layout {
            SegmentLayout::Frames(geometry) => Some(geometry),
            SegmentLayout::Raw { .. } => None,
        }
    }

    /// Total mapped size in bytes
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.segment.len()
    }

    /// Bytes available to a single frame
    #[inline(always)]
    pub fn payload_capacity(&self) -> usize {
        self.capacity() - self.layout.payload_offset()
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn layout(&self) -> SegmentLayout {
        self.layout
    }

    #[inline(always)]
    pub fn origin(&self) -> SegmentOrigin {
        self.origin
    }
}

impl<B: SegmentBackend> Drop for SharedSegmentWriter<B> {
    fn drop(&mut self) {
        debug!(name = %self.name, frame_id = ?self.frame_id(), "releasing segment");
    }
}
