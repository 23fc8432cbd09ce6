//! Codec benchmarks for huddle-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use huddle_protocol::{codec, ServerFrame};

fn bench_encode(c: &mut Criterion) {
    let frame = ServerFrame::dm_new(1, 2, "a".repeat(64), "2026-01-02 03:04:05");

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("dm_new_64B", |b| {
        b.iter(|| codec::encode(black_box(&frame)))
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let payload = format!(
        r#"{{"type":"dm_send","to_user_id":2,"text":"{}"}}"#,
        "a".repeat(64)
    );

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("dm_send_64B", |b| {
        b.iter(|| codec::decode(black_box(payload.as_bytes())))
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
