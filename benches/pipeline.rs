//! Frame handling benchmark suite.
//!
//! Benchmarks the per-frame hot path without any network:
//! - Vendor key normalization
//! - Message parsing, with and without extras
//!
//! Run with: cargo bench --bench pipeline
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gotify_relay::{GotifyMessage, normalize};

// ============================================================================
// Benchmark Inputs
// ============================================================================

const PLAIN: &str = r#"{"id":1,"appid":2,"message":"Backup finished","title":"Backup","priority":5,"date":"2024-05-01T10:00:00Z"}"#;

const WITH_EXTRAS: &str = r#"{"id":2,"appid":2,"message":"**Disk** at 91%","title":"Disk","priority":8,"date":"2024-05-01T10:00:00Z","extras":{"client::display":{"contentType":"text/markdown"},"client::notification":{"click":{"url":"https://grafana.local/d/disk"}},"android::action":{"onReceive":{"intentUrl":"https://grafana.local"}}}}"#;

const INPUTS: &[(&str, &str)] = &[("plain", PLAIN), ("extras", WITH_EXTRAS)];

// ============================================================================
// Benchmark: Normalize
// ============================================================================

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for &(name, frame) in INPUTS {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            b.iter(|| normalize(std::hint::black_box(frame)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Normalize + Parse
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &(name, frame) in INPUTS {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            b.iter(|| {
                let converted = normalize(std::hint::black_box(frame));
                GotifyMessage::parse(&converted)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_parse);
criterion_main!(benches);
