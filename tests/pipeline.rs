use std::path::PathBuf;

use geococo::config::TilerConfig;
use geococo::grid::{EdgePolicy, GeoTransform, PixelWindow};
use geococo::ir::io_coco_json::read_coco_json;
use geococo::pipeline::Tiler;
use geococo::source::io_geojson::read_geojson_layer;
use geococo::source::{ImageRaster, RasterSource};
use geococo::validation::{validate_dataset, validate_output_dir, ValidateOptions};
use geococo::GeococoError;

mod common;

use common::{layer, FakeRaster};

fn config(output_dir: PathBuf, train_percent: f64) -> TilerConfig {
    TilerConfig {
        output_dir,
        train_percent,
        seed: Some(17),
        ..TilerConfig::default()
    }
}

#[test]
fn two_tiles_side_by_side() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(600, 300, 1);
    let mut layers = vec![layer("empty", &[])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.tiles, 2);
    let written = raster.written.borrow();
    let windows: Vec<PixelWindow> = written.iter().map(|(w, _, _)| *w).collect();
    assert_eq!(
        windows,
        vec![
            PixelWindow::new(0, 0, 300, 300),
            PixelWindow::new(300, 0, 300, 300)
        ]
    );
    assert_eq!(written[0].2, out.path().join("Train").join("Band1").join("1.jpg"));
    assert_eq!(written[1].2, out.path().join("Train").join("Band1").join("2.jpg"));
}

#[test]
fn containing_feature_fills_the_tile() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(600, 300, 1);
    let mut layers = vec![layer("cover", &[(-10.0, -10.0, 310.0, 310.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    let train = &summary.datasets.train;
    assert_eq!(train.images.len(), 2);
    assert_eq!(train.annotations.len(), 2);

    let first = &train.annotations[0];
    assert_eq!(first.image_id.as_u64(), 1);
    let (x, y, w, h) = first.bbox.to_xywh();
    assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    assert!((w - 300.0).abs() < 1e-6 && (h - 300.0).abs() < 1e-6);
    assert!((first.area - 90_000.0).abs() < 1e-6);

    // The feature pokes 10 m into the second tile.
    let second = &train.annotations[1];
    assert_eq!(second.image_id.as_u64(), 2);
    let (x, y, w, h) = second.bbox.to_xywh();
    assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    assert!((w - 10.0).abs() < 1e-6 && (h - 300.0).abs() < 1e-6);
    assert!((second.area - 3_000.0).abs() < 1e-6);
}

#[test]
fn rotated_raster_annotations_stay_inside_their_tiles() {
    let out = tempfile::tempdir().unwrap();
    let (sin, cos) = 30f64.to_radians().sin_cos();
    let mut raster = FakeRaster::new(600, 300, 1);
    raster.gt = GeoTransform::new([0.0, cos, sin, 0.0, sin, -cos]).unwrap();
    let mut layers = vec![layer("cover", &[(-2000.0, -2000.0, 2000.0, 2000.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    let train = &summary.datasets.train;
    assert_eq!(train.annotations.len(), 2);
    for ann in &train.annotations {
        let (x, y, w, h) = ann.bbox.to_xywh();
        assert!(x.abs() < 1e-3 && y.abs() < 1e-3, "{:?}", ann.bbox);
        assert!((w - 300.0).abs() < 1e-3 && (h - 300.0).abs() < 1e-3, "{:?}", ann.bbox);
    }

    let report = validate_dataset(train, &ValidateOptions { strict: true });
    assert!(report.is_clean(), "unexpected issues:\n{}", report);
}

#[test]
fn disjoint_feature_yields_images_without_annotations() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(600, 300, 1);
    let mut layers = vec![layer("far", &[(1000.0, 1000.0, 1100.0, 1100.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 0.5))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.datasets.total_images(), 2);
    assert_eq!(summary.datasets.total_annotations(), 0);
    assert!(summary.skipped.is_empty());
}

#[test]
fn layers_are_rescanned_for_every_tile() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(900, 300, 1);
    let mut layers = vec![
        layer("roads", &[(0.0, 100.0, 900.0, 120.0)]),
        layer("fields", &[(50.0, 50.0, 850.0, 250.0)]),
    ];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    let train = &summary.datasets.train;
    assert_eq!(train.images.len(), 3);
    assert_eq!(train.annotations.len(), 6);
    for image in &train.images {
        let count = train
            .annotations
            .iter()
            .filter(|ann| ann.image_id == image.id)
            .count();
        assert_eq!(count, 2, "image {} should carry one annotation per layer", image.id);
    }
}

#[test]
fn touching_feature_is_skipped_not_fatal() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(600, 300, 1);
    // Shares only the x = 300 edge with the first tile.
    let mut layers = vec![layer("edge", &[(300.0, 0.0, 400.0, 300.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].layer, "edge");
    assert_eq!(summary.datasets.train.annotations.len(), 1);
    assert_eq!(summary.datasets.train.annotations[0].image_id.as_u64(), 2);
}

#[test]
fn train_percent_zero_routes_everything_to_test() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(900, 600, 1);
    let mut layers = vec![layer("cover", &[(0.0, 0.0, 900.0, 600.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 0.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.test.images, 6);
    assert_eq!(summary.train.images, 0);

    let test = read_coco_json(&out.path().join("annotations-test.json")).unwrap();
    let train = read_coco_json(&out.path().join("annotations-train.json")).unwrap();
    assert_eq!(test.images.len(), 6);
    assert_eq!(test.annotations.len(), 6);
    assert!(train.images.is_empty());
    assert_eq!(
        test.info.about,
        "Test Dataset for GeoTIFF and Polygon Annotations"
    );
    assert_eq!(train.categories[0].id.as_u64(), 100);
}

#[test]
fn split_is_complete_and_consistent() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(1500, 1500, 2);
    let mut layers = vec![layer("cover", &[(0.0, 0.0, 1500.0, 1500.0)])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 0.5))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.tiles, 25);
    assert_eq!(summary.datasets.total_images(), 25);
    assert_eq!(summary.chips_written, 50);

    for dataset in [&summary.datasets.train, &summary.datasets.test] {
        for (i, image) in dataset.images.iter().enumerate() {
            assert_eq!(image.id.as_u64(), i as u64 + 1);
        }
        for ann in &dataset.annotations {
            assert!(dataset.images.iter().any(|image| image.id == ann.image_id));
        }
    }
}

#[test]
fn same_seed_reproduces_the_split() {
    let run = || {
        let out = tempfile::tempdir().unwrap();
        let raster = FakeRaster::new(1200, 1200, 1);
        let mut layers = vec![layer("empty", &[])];
        let mut cfg = config(out.path().to_path_buf(), 0.5);
        cfg.write_chips = false;
        let summary = Tiler::new(cfg).unwrap().run(&raster, &mut layers).unwrap();
        (summary.train.images, summary.test.images)
    };
    assert_eq!(run(), run());
}

#[test]
fn clip_policy_shrinks_edge_tiles() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(650, 300, 1);
    let mut layers = vec![layer("empty", &[])];
    let cfg = TilerConfig {
        edge_policy: EdgePolicy::Clip,
        ..config(out.path().to_path_buf(), 1.0)
    };

    let summary = Tiler::new(cfg).unwrap().run(&raster, &mut layers).unwrap();

    let widths: Vec<u32> = summary.datasets.train.images.iter().map(|i| i.width).collect();
    assert_eq!(widths, vec![300, 300, 50]);
    assert_eq!(summary.out_of_bounds_windows, 0);
}

#[test]
fn extend_policy_counts_padded_tiles() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(650, 300, 1);
    let mut layers = vec![layer("empty", &[])];

    let summary = Tiler::new(config(out.path().to_path_buf(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.tiles, 3);
    assert_eq!(summary.out_of_bounds_windows, 1);
    assert!(summary.datasets.train.images.iter().all(|i| i.width == 300));
}

#[test]
fn out_of_range_band_is_fatal() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(300, 300, 3);
    let mut layers = vec![layer("empty", &[])];
    let cfg = TilerConfig {
        bands: vec![4],
        ..config(out.path().to_path_buf(), 1.0)
    };

    let err = Tiler::new(cfg).unwrap().run(&raster, &mut layers).unwrap_err();
    assert!(matches!(
        err,
        GeococoError::InvalidBand {
            band: 4,
            band_count: 3
        }
    ));
    assert!(!out.path().join("annotations-train.json").exists());
}

#[test]
fn selected_bands_only() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(300, 300, 3);
    let mut layers = vec![layer("empty", &[])];
    let cfg = TilerConfig {
        bands: vec![3, 1],
        ..config(out.path().to_path_buf(), 1.0)
    };

    Tiler::new(cfg).unwrap().run(&raster, &mut layers).unwrap();

    let bands: Vec<usize> = raster.written.borrow().iter().map(|(_, b, _)| *b).collect();
    assert_eq!(bands, vec![3, 1]);
}

#[test]
fn no_chips_writes_documents_only() {
    let out = tempfile::tempdir().unwrap();
    let raster = FakeRaster::new(600, 300, 1);
    let mut layers = vec![layer("empty", &[])];
    let mut cfg = config(out.path().to_path_buf(), 1.0);
    cfg.write_chips = false;

    let summary = Tiler::new(cfg).unwrap().run(&raster, &mut layers).unwrap();

    assert_eq!(summary.chips_written, 0);
    assert!(raster.written.borrow().is_empty());
    assert!(out.path().join("annotations-train.json").is_file());
    assert!(!out.path().join("Train").exists());
}

#[test]
fn real_raster_output_validates_clean() {
    let work = tempfile::tempdir().unwrap();
    let png = common::write_georeferenced_png(work.path(), "scene", 500, 400);
    let vector = common::write_rectangles_geojson(
        work.path(),
        "buildings",
        &[(20.0, 20.0, 120.0, 90.0), (250.0, 150.0, 420.0, 380.0)],
    );
    let out = work.path().join("out");

    let raster = ImageRaster::open(&png, None).unwrap();
    let mut layers = vec![read_geojson_layer(&vector).unwrap()];
    let summary = Tiler::new(config(out.clone(), 0.5))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.tiles, 4);
    assert_eq!(summary.chips_written, 4);

    let report = validate_output_dir(&out, &ValidateOptions::default()).unwrap();
    assert!(report.is_clean(), "unexpected issues:\n{}", report);
    assert_eq!(report.bands, vec![1]);
}

#[test]
fn float_geotiff_without_sidecar_validates_clean() {
    let work = tempfile::tempdir().unwrap();
    let tif = common::write_float_geotiff(work.path(), "S1_sigma0_TC", 400, 300);
    let vector = common::write_rectangles_geojson(
        work.path(),
        "ships",
        &[(40.0, 40.0, 80.0, 60.0), (280.0, 100.0, 350.0, 250.0)],
    );
    let out = work.path().join("out");

    let raster = ImageRaster::open(&tif, None).unwrap();
    assert_eq!(raster.geo_transform(), common::unit_transform(300));

    let mut layers = vec![read_geojson_layer(&vector).unwrap()];
    let summary = Tiler::new(config(out.clone(), 1.0))
        .unwrap()
        .run(&raster, &mut layers)
        .unwrap();

    assert_eq!(summary.tiles, 2);
    assert_eq!(summary.train.annotations, 3);
    let report = validate_output_dir(&out, &ValidateOptions { strict: true }).unwrap();
    assert!(report.is_clean(), "unexpected issues:\n{}", report);
}
