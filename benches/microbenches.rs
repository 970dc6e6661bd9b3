//! Criterion microbenches for the tiling hot paths.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure:
//! - clipping a layer of features against one tile (extract_annotations)
//! - COCO JSON writing of a partition (to_coco_string)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use geo::{polygon, MultiPolygon};
use geococo::annotate::{extract_annotations, ExtractOptions};
use geococo::grid::{window_to_polygon, GeoTransform, PixelWindow};
use geococo::ir::io_coco_json::to_coco_string;
use geococo::source::{Feature, VectorLayer};
use geococo::split::DatasetAssembler;

/// A 20x20 lattice of 40 m squares over a 1 m north-up grid.
fn lattice_layer() -> VectorLayer {
    let mut features = Vec::new();
    for i in 0..20 {
        for j in 0..20 {
            let (x, y) = (i as f64 * 50.0, j as f64 * 50.0);
            let square = polygon![
                (x: x, y: y),
                (x: x + 40.0, y: y),
                (x: x + 40.0, y: y + 40.0),
                (x: x, y: y + 40.0),
                (x: x, y: y),
            ];
            features.push(Feature::new(features.len(), MultiPolygon::new(vec![square])));
        }
    }
    VectorLayer::new("lattice", features)
}

fn transform() -> GeoTransform {
    GeoTransform::north_up(0.0, 1000.0, 1.0, -1.0).unwrap()
}

/// Benchmark clipping 400 features against one 300x300 tile.
fn bench_extract_annotations(c: &mut Criterion) {
    let gt = transform();
    let tile = window_to_polygon(&PixelWindow::new(300, 300, 300, 300), &gt);
    let mut layers = vec![lattice_layer()];
    let options = ExtractOptions::default();

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Elements(layers[0].len() as u64));

    group.bench_function("extract_annotations", |b| {
        b.iter(|| {
            let extraction = extract_annotations(black_box(&tile), &mut layers, &gt, &options);
            black_box(extraction)
        })
    });

    group.finish();
}

/// Benchmark COCO JSON writing for a 16-tile partition.
///
/// The dataset is assembled once; only serialization is timed.
fn bench_coco_write(c: &mut Criterion) {
    let gt = transform();
    let mut layers = vec![lattice_layer()];
    let options = ExtractOptions::default();
    let mut assembler = DatasetAssembler::new(1.0, Some(0)).unwrap();

    for col in 0..4 {
        for row in 0..4 {
            let window = PixelWindow::new(col * 250, row * 250, 250, 250);
            let slot = assembler.begin_tile(window.width, window.height);
            let tile = window_to_polygon(&window, &gt);
            for draft in extract_annotations(&tile, &mut layers, &gt, &options).drafts {
                assembler.add_annotation(&slot, draft);
            }
        }
    }
    let datasets = assembler.finish();

    let mut group = c.benchmark_group("coco_write");
    group.throughput(Throughput::Elements(datasets.train.annotations.len() as u64));

    group.bench_function("to_coco_string", |b| {
        b.iter(|| {
            let json = to_coco_string(black_box(&datasets.train)).unwrap();
            black_box(json)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_extract_annotations, bench_coco_write);
criterion_main!(benches);
