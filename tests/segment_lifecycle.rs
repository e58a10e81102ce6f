//! Writer lifecycle against real OS shared memory.
//!
//! A second, non-owning mapping of the same name stands in for the external
//! reader process.

use synapse_memory::shm::{Ownership, PlatformSegment, SegmentBackend, SegmentName};
use synapse_memory::{
    FrameGeometry, SegmentOrigin, SharedSegmentWriter, SynapseError, WriterConfig, HEADER_SIZE,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn unique(tag: &str) -> String {
    format!("syn_it_{}_{}", tag, std::process::id())
}

/// Map the segment the way an external reader would
fn reader_view(name: &str, len: usize) -> PlatformSegment {
    let name = SegmentName::new(name).unwrap();
    PlatformSegment::open_existing(&name, len, Ownership::Borrowed).unwrap()
}

fn read_u32(seg: &PlatformSegment, offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    unsafe { std::ptr::copy_nonoverlapping(seg.as_ptr().add(offset), bytes.as_mut_ptr(), 4) };
    u32::from_ne_bytes(bytes)
}

fn read_bytes(seg: &PlatformSegment, offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    unsafe { std::ptr::copy_nonoverlapping(seg.as_ptr().add(offset), out.as_mut_ptr(), len) };
    out
}

#[test]
fn capacity_matches_geometry() {
    init_tracing();
    let name = unique("capacity");

    for (w, h, c) in [(1, 1, 1), (10, 10, 1), (64, 48, 3), (33, 7, 4)] {
        let writer = SharedSegmentWriter::create_frames(&name, w, h, c).unwrap();
        assert_eq!(
            writer.capacity(),
            HEADER_SIZE + (w * h * c) as usize,
            "{w}x{h}x{c}"
        );
        assert_eq!(writer.buffer().len(), writer.capacity());
        assert_eq!(writer.payload_capacity(), (w * h * c) as usize);
    }
}

#[test]
fn reader_sees_header_and_frames() {
    init_tracing();
    let name = unique("reader");

    // 16 + 1008 = 1024 bytes
    let mut writer = SharedSegmentWriter::create_frames(&name, 1008, 1, 1).unwrap();
    assert_eq!(writer.capacity(), 1024);

    let reader = reader_view(&name, 1024);
    assert_eq!(read_u32(&reader, 0), 0);
    assert_eq!(read_u32(&reader, 4), 1008);
    assert_eq!(read_u32(&reader, 8), 1);
    assert_eq!(read_u32(&reader, 12), 1);

    let frames: Vec<Vec<u8>> = (0..3u8)
        .map(|n| (0..1000).map(|i| (i as u8).wrapping_mul(n + 1)).collect())
        .collect();
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(writer.write_frame(frame).unwrap(), i as u32 + 1);
    }

    assert_eq!(writer.frame_id(), Some(3));
    assert_eq!(read_u32(&reader, 0), 3);
    assert_eq!(read_bytes(&reader, HEADER_SIZE, 1000), frames[2]);
}

#[test]
fn oversized_write_leaves_segment_untouched() {
    init_tracing();
    let name = unique("oversize");

    let mut writer = SharedSegmentWriter::create_frames(&name, 10, 10, 1).unwrap();
    assert_eq!(writer.capacity(), 116);
    writer.write_frame(&[3u8; 100]).unwrap();

    let before = writer.buffer().to_vec();
    let err = writer.write_frame(&[0xee; 150]).unwrap_err();

    assert!(matches!(
        err,
        SynapseError::PayloadTooLarge { max: 100, got: 150 }
    ));
    assert_eq!(writer.buffer(), &before[..]);
    assert_eq!(writer.frame_id(), Some(1));
}

#[test]
fn recreate_after_drop_starts_fresh() {
    init_tracing();
    let name = unique("recreate");
    let geometry = FrameGeometry::new(4, 4, 4).unwrap();
    let config = WriterConfig::frames(name.clone(), geometry);

    let mut first = SharedSegmentWriter::create(&config).unwrap();
    first.write_frame(&[1u8; 64]).unwrap();
    first.write_frame(&[2u8; 64]).unwrap();
    assert_eq!(first.frame_id(), Some(2));
    drop(first);

    // The name is gone once the writer is dropped
    let segment_name = SegmentName::new(&name).unwrap();
    assert!(matches!(
        PlatformSegment::open_existing(&segment_name, 80, Ownership::Borrowed),
        Err(SynapseError::SegmentOpenFailed { .. })
    ));

    let second = SharedSegmentWriter::create(&config).unwrap();
    assert_eq!(second.origin(), SegmentOrigin::Created);
    assert_eq!(second.frame_id(), Some(0));
    assert!(second.buffer()[HEADER_SIZE..].iter().all(|&b| b == 0));
}

#[cfg(unix)]
#[test]
fn stale_segment_from_crashed_writer_is_replaced() {
    init_tracing();
    let name = unique("stale");
    let segment_name = SegmentName::new(&name).unwrap();

    // A crashed writer leaves its object registered
    let stale = PlatformSegment::create_exclusive(&segment_name, 32).unwrap();
    unsafe { std::ptr::write_bytes(stale.as_ptr(), 0xff, 32) };
    std::mem::forget(stale);

    let writer = SharedSegmentWriter::create_frames(&name, 4, 4, 1).unwrap();
    assert_eq!(writer.origin(), SegmentOrigin::Created);
    assert_eq!(writer.frame_id(), Some(0));
    assert_eq!(writer.geometry(), Some(geometry(4, 4, 1)));
}

#[cfg(unix)]
fn geometry(width: u32, height: u32, channels: u32) -> FrameGeometry {
    FrameGeometry::new(width, height, channels).unwrap()
}

#[test]
fn raw_segment_is_all_payload() {
    init_tracing();
    let name = unique("raw");

    let mut writer = SharedSegmentWriter::create_raw(&name, 1024).unwrap();
    assert_eq!(writer.capacity(), 1024);
    assert_eq!(writer.frame_id(), None);

    writer.buffer_mut().unwrap()[..100].fill(7);

    let reader = reader_view(&name, 1024);
    assert_eq!(read_bytes(&reader, 0, 100), vec![7u8; 100]);
    assert_eq!(read_bytes(&reader, 100, 924), vec![0u8; 924]);
}

#[test]
fn frame_header_is_never_mutably_exposed() {
    init_tracing();
    let name = unique("locked");

    let mut writer = SharedSegmentWriter::create_frames(&name, 4, 4, 1).unwrap();
    assert!(matches!(
        writer.buffer_mut(),
        Err(SynapseError::FramesLayout(_))
    ));

    writer.payload_mut().fill(0xff);
    assert_eq!(writer.commit_frame().unwrap(), 1);

    let reader = reader_view(&name, writer.capacity());
    assert_eq!(read_u32(&reader, 0), 1);
    assert_eq!(read_u32(&reader, 4), 4);
    assert_eq!(read_u32(&reader, 8), 4);
    assert_eq!(read_u32(&reader, 12), 1);
    assert_eq!(read_bytes(&reader, HEADER_SIZE, 16), vec![0xffu8; 16]);
}

#[test]
fn invalid_construction_is_reported() {
    assert!(matches!(
        SharedSegmentWriter::create_frames(&unique("zero"), 0, 480, 3),
        Err(SynapseError::InvalidGeometry { .. })
    ));
    assert!(matches!(
        SharedSegmentWriter::create_raw(&unique("empty"), 0),
        Err(SynapseError::InvalidCapacity(0))
    ));
    assert!(matches!(
        SharedSegmentWriter::create_raw("bad/name", 16),
        Err(SynapseError::InvalidName { .. })
    ));
}
