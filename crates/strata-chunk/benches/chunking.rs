//! Benchmarks for boundary scanning and full chunking.

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_chunk::{BoundaryFinder, Chunker, ChunkingOptions, LeafOptions};
use strata_store::InMemoryBlobStore;

fn bench_data(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state: u32 = 0x5EED_CAFE;
    for _ in 0..size {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        data.push((state >> 16) as u8);
    }
    data
}

fn bench_boundaries(c: &mut Criterion) {
    let finder = BoundaryFinder::new(&LeafOptions::default());
    let mut group = c.benchmark_group("boundaries");
    for &size in &[1024 * 1024, 16 * 1024 * 1024] {
        let data = bench_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| finder.split(data).count());
        });
    }
    group.finish();
}

fn bench_chunk_to_memory(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let mut group = c.benchmark_group("chunk_to_memory");
    for &size in &[1024 * 1024, 8 * 1024 * 1024] {
        let data = Bytes::from(bench_data(size));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let store = InMemoryBlobStore::new();
                let chunker = Chunker::new(&store, ChunkingOptions::default()).expect("options");
                rt.block_on(chunker.chunk_bytes(data.clone())).expect("chunk")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_boundaries, bench_chunk_to_memory);
criterion_main!(benches);
