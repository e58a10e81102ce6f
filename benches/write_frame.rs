use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use synapse_memory::SharedSegmentWriter;

fn bench_write_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_frame");

    for &(width, height) in &[(64u32, 48u32), (640, 480), (1920, 1080)] {
        let name = format!("syn_b_{}_{}x{}", std::process::id(), width, height);
        let mut writer = match SharedSegmentWriter::create_frames(&name, width, height, 3) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("skipping {width}x{height}: {e}");
                continue;
            }
        };
        let frame = vec![0x5a; writer.payload_capacity()];

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &frame,
            |b, frame| b.iter(|| writer.write_frame(black_box(frame))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_write_frame);
criterion_main!(benches);
