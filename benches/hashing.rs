use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use regex::Regex;
use rfseek::CancelToken;
use rfseek::hash::{MurmurVariant, hash_reader, murmur3_x64_128, murmur3_x86_32};
use rfseek::scanner::{ScanLimits, scan};
use std::hint::black_box;
use std::io::Cursor;
use std::path::Path;

fn sample_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("line {i}: the quick brown fox jumps over the lazy dog\n"))
        .collect()
}

fn hashing_benchmark(c: &mut Criterion) {
    let data = vec![0xa5u8; 4 * 1024 * 1024];

    let mut group = c.benchmark_group("murmur3");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("x86_32", |b| b.iter(|| murmur3_x86_32(black_box(&data), 0)));
    group.bench_function("x64_128", |b| b.iter(|| murmur3_x64_128(black_box(&data), 0)));
    group.bench_function("x64_128_streamed", |b| {
        b.iter(|| hash_reader(Cursor::new(black_box(&data)), MurmurVariant::X64_128))
    });
    group.finish();
}

fn scan_benchmark(c: &mut Criterion) {
    let text = sample_text(20_000);
    let pattern = Regex::new("(?i)lazy").unwrap();
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("line_scan", |b| {
        b.iter(|| {
            scan(
                Cursor::new(black_box(text.as_bytes())),
                &ScanLimits::default(),
                &pattern,
                &cancel,
                Path::new("bench"),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, hashing_benchmark, scan_benchmark);
criterion_main!(benches);
