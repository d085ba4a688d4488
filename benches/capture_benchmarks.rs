// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Lonkero DDP - Performance Benchmarks
//! © 2026 Bountyy Oy
//!
//! Capture scanning throughput, wire codec and confuser derivation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use lonkero_ddp::capture::{CaptureScanner, SENTINEL};
use lonkero_ddp::confuser::{confuser_probes, type_descriptor};
use lonkero_ddp::ddp::{codec, Message};

fn record(message: &Message) -> Vec<u8> {
    let mut payload = b"a".to_vec();
    payload.extend_from_slice(codec::encode(message).unwrap().as_bytes());
    let len = payload.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&(len + 8).to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.push(SENTINEL);
    out
}

/// Interleaves DDP records with opaque TCP/TLS-looking noise
fn synthetic_capture(records: usize) -> Vec<u8> {
    let mut capture = Vec::new();
    for i in 0..records {
        capture.extend((0..64).map(|n| ((i * 31 + n * 7) % 251 + 1) as u8));
        let message = Message::method(
            format!("collection{}.update", i % 17),
            vec![json!({"_id": format!("doc-{}", i)}), json!({"$set": {"n": i}})],
        );
        capture.extend(record(&message));
    }
    capture
}

fn benchmark_capture_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture_scan");
    for records in [1_000usize, 10_000] {
        let capture = synthetic_capture(records);
        group.throughput(Throughput::Bytes(capture.len() as u64));
        for page_size in [4 * 1024usize, 1024 * 1024] {
            let scanner = CaptureScanner::new().with_page_size(page_size);
            group.bench_with_input(
                BenchmarkId::new(format!("records_{}", records), page_size),
                &capture,
                |b, capture| {
                    b.iter(|| {
                        let scan = scanner.scan_reader(black_box(capture.as_slice())).unwrap();
                        black_box(scan.messages.len())
                    })
                },
            );
        }
    }
    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let message = Message::method(
        "orders.search",
        vec![json!({"customer": {"id": "c-1", "tags": ["a", "b"]}, "limit": 50})],
    );
    let wire = codec::encode(&message).unwrap();
    let sockjs = format!("a{}", wire);

    c.bench_function("codec_encode", |b| b.iter(|| codec::encode(black_box(&message))));
    c.bench_function("codec_decode_sockjs", |b| {
        b.iter(|| codec::decode_frame(black_box(&sockjs)))
    });
}

fn nested_params(depth: usize, width: usize) -> Value {
    if depth == 0 {
        return json!("leaf");
    }
    let fields: serde_json::Map<String, Value> = (0..width)
        .map(|i| (format!("f{}", i), nested_params(depth - 1, width)))
        .collect();
    Value::Object(fields)
}

fn benchmark_confuser_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("confuser_derivation");
    for (depth, width) in [(2usize, 3usize), (3, 4), (4, 4)] {
        let template = Message::method("deep.call", vec![nested_params(depth, width), json!(1)]);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", depth, width)),
            &template,
            |b, template| {
                b.iter(|| {
                    let probes = confuser_probes(black_box(template)).unwrap();
                    black_box(probes.len())
                })
            },
        );
    }

    let document = nested_params(4, 4);
    group.bench_function("type_descriptor", |b| {
        b.iter(|| type_descriptor(black_box(&document)))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_capture_scan,
    benchmark_codec,
    benchmark_confuser_derivation
);

criterion_main!(benches);
