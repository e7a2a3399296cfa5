//! Criterion micro-benchmarks for overlap-band raster exchange.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tessera_core::{RasterId, Size2D, TaskId};
use tessera_raster::RasterStore;
use tessera_space::PartitionLayout;

/// Store for `task` with `n` dynamic rasters filled with 5 in [0, 10].
fn store_for(layout: &PartitionLayout, task: TaskId, n: u32) -> RasterStore {
    let section = layout.section(task).unwrap();
    let mut store = RasterStore::new(section.boundaries());
    for i in 0..n {
        let name = format!("r{i}");
        store.register_dynamic(&name, false, Some(RasterId(i))).unwrap();
        store.set_init_values(name.as_str(), 0, 10, 5).unwrap();
    }
    store.seal();
    store
}

/// Benchmark: extract the shared band of a 256x256 two-task split, 4 rasters.
fn bench_extract_band(c: &mut Criterion) {
    let layout = PartitionLayout::new(Size2D::new(256, 256), 2, 2).unwrap();
    let store = store_for(&layout, TaskId(0), 4);
    let band = layout.band(TaskId(0), TaskId(1)).unwrap();

    c.bench_function("extract_band_256_overlap2_4r", |b| {
        b.iter(|| black_box(store.extract_patches(&band, false)));
    });
}

/// Benchmark: apply the neighbour's band patches.
fn bench_apply_band(c: &mut Criterion) {
    let layout = PartitionLayout::new(Size2D::new(256, 256), 2, 2).unwrap();
    let sender = store_for(&layout, TaskId(0), 4);
    let mut receiver = store_for(&layout, TaskId(1), 4);
    let band = layout.band(TaskId(0), TaskId(1)).unwrap();
    let patches = sender.extract_patches(&band, false);

    c.bench_function("apply_band_256_overlap2_4r", |b| {
        b.iter(|| {
            for patch in &patches {
                receiver.apply_patch(patch).unwrap();
            }
        });
    });
}

/// Benchmark: grow one 256x256 dynamic raster by one step.
fn bench_grow_full_raster(c: &mut Criterion) {
    let layout = PartitionLayout::new(Size2D::new(256, 256), 1, 0).unwrap();
    let mut store = store_for(&layout, TaskId(0), 1);

    c.bench_function("grow_by_256x256", |b| {
        b.iter(|| store.grow_by(RasterId(0), 1).unwrap());
    });
}

criterion_group!(benches, bench_extract_band, bench_apply_band, bench_grow_full_raster);
criterion_main!(benches);
