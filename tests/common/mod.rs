#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use geo::{polygon, MultiPolygon};
use geococo::grid::{GeoTransform, PixelWindow};
use geococo::source::{Feature, RasterSource, VectorLayer};
use geococo::GeococoError;
use image::{GrayImage, Luma};

/// A north-up 1 m grid whose top-left corner is at map (0, `height`).
pub fn unit_transform(height: u32) -> GeoTransform {
    GeoTransform::north_up(0.0, height as f64, 1.0, -1.0).expect("valid transform")
}

/// Writes a grayscale gradient PNG and its `.pgw` world file.
///
/// The world file places the raster on [`unit_transform`].
pub fn write_georeferenced_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let png = dir.join(format!("{name}.png"));
    let image = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));
    image.save(&png).expect("write png");

    // C and F name the centre of the top-left pixel.
    let world = format!("1.0\n0.0\n0.0\n-1.0\n0.5\n{}\n", height as f64 - 0.5);
    fs::write(dir.join(format!("{name}.pgw")), world).expect("write world file");
    png
}

/// Writes a single-band float32 GeoTIFF georeferenced by its own
/// ModelPixelScale and ModelTiepoint tags, on [`unit_transform`].
pub fn write_float_geotiff(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    let path = dir.join(format!("{name}.tif"));
    let samples: Vec<f32> = (0..width * height)
        .map(|i| ((i % width) + (i / width)) as f32 * 1e-3)
        .collect();

    let mut tiff = TiffEncoder::new(fs::File::create(&path).expect("create tiff")).expect("tiff encoder");
    let mut image = tiff
        .new_image::<colortype::Gray32Float>(width, height)
        .expect("tiff image");
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
        .expect("pixel scale tag");
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 0.0, height as f64, 0.0][..])
        .expect("tiepoint tag");
    image.write_data(&samples).expect("tiff data");
    path
}

/// Writes a FeatureCollection of axis-aligned map-space rectangles
/// `(x0, y0, x1, y1)`.
pub fn write_rectangles_geojson(
    dir: &Path,
    name: &str,
    rects: &[(f64, f64, f64, f64)],
) -> PathBuf {
    let features: Vec<String> = rects
        .iter()
        .enumerate()
        .map(|(i, (x0, y0, x1, y1))| {
            format!(
                r#"{{"type":"Feature","id":{i},"properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}"#
            )
        })
        .collect();
    let json = format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    );

    let path = dir.join(format!("{name}.geojson"));
    fs::write(&path, json).expect("write geojson");
    path
}

pub fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ]])
}

pub fn layer(name: &str, rects: &[(f64, f64, f64, f64)]) -> VectorLayer {
    let features = rects
        .iter()
        .enumerate()
        .map(|(i, &(x0, y0, x1, y1))| Feature::new(i, rectangle(x0, y0, x1, y1)))
        .collect();
    VectorLayer::new(name, features)
}

/// An in-memory raster that records requested chips instead of encoding
/// them.
pub struct FakeRaster {
    pub width: u32,
    pub height: u32,
    pub bands: usize,
    pub gt: GeoTransform,
    pub written: RefCell<Vec<(PixelWindow, usize, PathBuf)>>,
}

impl FakeRaster {
    pub fn new(width: u32, height: u32, bands: usize) -> Self {
        Self {
            width,
            height,
            bands,
            gt: unit_transform(height),
            written: RefCell::new(Vec::new()),
        }
    }
}

impl RasterSource for FakeRaster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn geo_transform(&self) -> GeoTransform {
        self.gt
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn extract_window(
        &self,
        window: &PixelWindow,
        band: usize,
        path: &Path,
    ) -> Result<(), GeococoError> {
        self.written
            .borrow_mut()
            .push((*window, band, path.to_path_buf()));
        Ok(())
    }
}
