//! Raster access: size, geotransform, bands, and windowed chip extraction.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Pixel};
use log::{debug, info};

use super::geotiff::GeoTiffReader;
use super::world_file::find_world_file;
use crate::error::GeococoError;
use crate::grid::{GeoTransform, PixelWindow};

/// A georeferenced raster the tiler can cut chips from.
///
/// Bands are numbered from 1.
pub trait RasterSource {
    /// Raster size in pixels, `(width, height)`.
    fn size(&self) -> (u32, u32);

    fn geo_transform(&self) -> GeoTransform;

    fn band_count(&self) -> usize;

    /// Extracts `window` from `band` and encodes it to `path`.
    ///
    /// Windows may extend past the raster; the uncovered part of the chip
    /// is filled with zeros.
    fn extract_window(
        &self,
        window: &PixelWindow,
        band: usize,
        path: &Path,
    ) -> Result<(), GeococoError>;
}

/// One decoded band with the range of its finite samples.
#[derive(Clone, Debug)]
struct Band {
    samples: Vec<f32>,
    min: f32,
    max: f32,
}

impl Band {
    fn new(samples: Vec<f32>) -> Self {
        let (min, max) = samples
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range: Option<(f32, f32)>, v| match range {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((0.0, 0.0));
        Self { samples, min, max }
    }

    /// Linear stretch of the band's min..max onto 0..255. NaN and infinite
    /// samples render as 0.
    #[inline]
    fn scale(&self, value: f32) -> u8 {
        if self.max <= self.min || !value.is_finite() {
            return 0;
        }
        let scaled = (value - self.min) * 255.0 / (self.max - self.min);
        scaled.round().clamp(0.0, 255.0) as u8
    }
}

/// A decoded raster and its geotransform.
///
/// TIFFs are decoded with the `tiff` crate, keeping their sample type and
/// embedded georeferencing; other formats go through the `image` crate.
/// Each channel is one band. Chips are 8-bit grayscale JPEGs stretched from
/// the band's full min/max range.
#[derive(Clone, Debug)]
pub struct ImageRaster {
    path: PathBuf,
    width: u32,
    height: u32,
    geo_transform: GeoTransform,
    bands: Vec<Band>,
}

impl ImageRaster {
    /// Opens and decodes `path`.
    ///
    /// The geotransform is taken from, in order: `geo_transform`, the
    /// GeoTIFF tags of a `.tif`/`.tiff` file, and a world file sidecar. A
    /// raster with none of them is rejected before its pixels are decoded.
    pub fn open(path: &Path, geo_transform: Option<GeoTransform>) -> Result<Self, GeococoError> {
        info!("Opening raster: {}", path.display());

        let raster = if is_tiff(path) {
            let reader = GeoTiffReader::open(path)?;
            let embedded = match geo_transform {
                Some(_) => None,
                None => reader.geo_transform()?,
            };
            let geo_transform = resolve_geo_transform(path, geo_transform.or(embedded))?;
            let (width, height) = reader.dimensions();
            Self::from_planes(width, height, reader.read_planes()?, geo_transform)
        } else {
            let geo_transform = resolve_geo_transform(path, geo_transform)?;
            let image = image::open(path).map_err(|source| GeococoError::RasterOpen {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_image(&image, geo_transform)
        };

        info!(
            "Raster size: {} x {} pixels, {} band(s)",
            raster.width,
            raster.height,
            raster.bands.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            ..raster
        })
    }

    /// Wraps an already decoded image.
    pub fn from_image(image: &DynamicImage, geo_transform: GeoTransform) -> Self {
        let bands = match image.color().channel_count() {
            1 => split_bands(&image.to_luma16()),
            2 => split_bands(&image.to_luma_alpha16()),
            3 => split_bands(&image.to_rgb16()),
            _ => split_bands(&image.to_rgba16()),
        };
        let planes = bands
            .into_iter()
            .map(|plane| plane.into_iter().map(f32::from).collect())
            .collect();

        Self::from_planes(image.width(), image.height(), planes, geo_transform)
    }

    fn from_planes(
        width: u32,
        height: u32,
        planes: Vec<Vec<f32>>,
        geo_transform: GeoTransform,
    ) -> Self {
        Self {
            path: PathBuf::new(),
            width,
            height,
            geo_transform,
            bands: planes.into_iter().map(Band::new).collect(),
        }
    }

    /// Source path, empty for rasters built with [`from_image`](Self::from_image).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `window` of `band` as an 8-bit chip without encoding it.
    pub fn render_window(&self, window: &PixelWindow, band: usize) -> Result<GrayImage, GeococoError> {
        let data = self.band(band)?;

        let chip = ImageBuffer::from_fn(window.width, window.height, |x, y| {
            let src_x = window.x_off as u64 + x as u64;
            let src_y = window.y_off as u64 + y as u64;
            if src_x >= self.width as u64 || src_y >= self.height as u64 {
                return Luma([0u8]);
            }
            let idx = src_y as usize * self.width as usize + src_x as usize;
            Luma([data.scale(data.samples[idx])])
        });

        Ok(chip)
    }

    fn band(&self, band: usize) -> Result<&Band, GeococoError> {
        band.checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or(GeococoError::InvalidBand {
                band,
                band_count: self.bands.len(),
            })
    }
}

impl RasterSource for ImageRaster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn extract_window(
        &self,
        window: &PixelWindow,
        band: usize,
        path: &Path,
    ) -> Result<(), GeococoError> {
        let chip = self.render_window(window, band)?;
        debug!("Writing band {} chip {}", band, path.display());
        chip.save_with_format(path, ImageFormat::Jpeg)
            .map_err(|source| GeococoError::ChipWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

/// Falls back to a world file sidecar when no transform is known yet.
fn resolve_geo_transform(
    path: &Path,
    known: Option<GeoTransform>,
) -> Result<GeoTransform, GeococoError> {
    if let Some(gt) = known {
        return Ok(gt);
    }
    match find_world_file(path)? {
        Some(gt) => {
            debug!("Georeferenced {} from its world file", path.display());
            Ok(gt)
        }
        None => Err(GeococoError::MissingGeoTransform {
            path: path.to_path_buf(),
        }),
    }
}

/// Splits an interleaved buffer into one sample plane per channel.
fn split_bands<P>(buffer: &ImageBuffer<P, Vec<u16>>) -> Vec<Vec<u16>>
where
    P: Pixel<Subpixel = u16>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let len = buffer.width() as usize * buffer.height() as usize;
    let mut planes = vec![Vec::with_capacity(len); channels];

    for pixel in buffer.pixels() {
        for (plane, value) in planes.iter_mut().zip(pixel.channels()) {
            plane.push(*value);
        }
    }
    planes
}
