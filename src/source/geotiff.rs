//! GeoTIFF decoding with embedded georeferencing.
//!
//! The affine transform comes from ModelTransformation (34264) when present,
//! otherwise from the first ModelTiepoint (33922) plus ModelPixelScale
//! (33550). Samples of any numeric type, including the single-band float32
//! rasters typical of calibrated SAR products, are widened to `f32` planes.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use log::debug;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::{TiffError, TiffResult};

use crate::error::GeococoError;
use crate::grid::GeoTransform;

/// `GTRasterTypeGeoKey` in the GeoKeyDirectory.
const RASTER_TYPE_GEO_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Value of the PlanarConfiguration tag for band-sequential storage.
const PLANAR_SEPARATE: u16 = 2;

/// Georeferencing tags read from the first image directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeoTiffTags {
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoints: Option<Vec<f64>>,
    pub transformation: Option<Vec<f64>>,
    /// The raster declares `RasterPixelIsPoint`; tiepoints name pixel centres.
    pub pixel_is_point: bool,
}

impl GeoTiffTags {
    fn read<R: Read + Seek>(decoder: &mut Decoder<R>) -> TiffResult<Self> {
        let f64_tag = |decoder: &mut Decoder<R>, tag| -> TiffResult<Option<Vec<f64>>> {
            decoder.find_tag(tag)?.map(|v| v.into_f64_vec()).transpose()
        };

        let pixel_scale = f64_tag(decoder, Tag::ModelPixelScaleTag)?;
        let tiepoints = f64_tag(decoder, Tag::ModelTiepointTag)?;
        let transformation = f64_tag(decoder, Tag::ModelTransformationTag)?;
        let pixel_is_point = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(value) => raster_type(&value.into_u16_vec()?) == Some(RASTER_PIXEL_IS_POINT),
            None => false,
        };

        Ok(Self {
            pixel_scale,
            tiepoints,
            transformation,
            pixel_is_point,
        })
    }

    /// Builds the GDAL-ordered geotransform the tags describe.
    ///
    /// Returns `Ok(None)` when the tags carry no affine georeferencing, e.g.
    /// an untagged TIFF or one with ground control points only.
    pub fn geo_transform(&self) -> Result<Option<GeoTransform>, GeococoError> {
        let coefficients = match (&self.transformation, &self.tiepoints, &self.pixel_scale) {
            (Some(m), _, _) if m.len() >= 16 => [m[3], m[0], m[1], m[7], m[4], m[5]],
            (_, Some(tie), Some(scale)) if tie.len() >= 6 && scale.len() >= 2 => {
                let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
                let (sx, sy) = (scale[0], scale[1]);
                [x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]
            }
            _ => return Ok(None),
        };

        let [mut x0, a, b, mut y0, d, e] = coefficients;
        if self.pixel_is_point {
            x0 -= 0.5 * (a + b);
            y0 -= 0.5 * (d + e);
        }
        GeoTransform::new([x0, a, b, y0, d, e]).map(Some)
    }
}

/// Reads the `GTRasterTypeGeoKey` value out of a GeoKeyDirectory.
///
/// The directory is a 4-value header whose last entry is the key count,
/// followed by `(key, location, count, value)` quadruples.
fn raster_type(directory: &[u16]) -> Option<u16> {
    let count = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == RASTER_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3])
}

/// An opened GeoTIFF whose tags are read but whose pixels are not yet
/// decoded.
pub struct GeoTiffReader {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    tags: GeoTiffTags,
}

impl GeoTiffReader {
    pub fn open(path: &Path) -> Result<Self, GeococoError> {
        let wrap = |source: TiffError| GeococoError::TiffDecode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(wrap)?
            .with_limits(Limits::unlimited());
        let (width, height) = decoder.dimensions().map_err(wrap)?;
        let tags = GeoTiffTags::read(&mut decoder).map_err(wrap)?;
        debug!("GeoTIFF tags of {}: {:?}", path.display(), tags);

        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            width,
            height,
            tags,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn tags(&self) -> &GeoTiffTags {
        &self.tags
    }

    pub fn geo_transform(&self) -> Result<Option<GeoTransform>, GeococoError> {
        self.tags.geo_transform()
    }

    /// Decodes every sample and returns one row-major plane per band.
    pub fn read_planes(mut self) -> Result<Vec<Vec<f32>>, GeococoError> {
        let path = self.path;
        let wrap = |source: TiffError| GeococoError::TiffDecode {
            path: path.clone(),
            source,
        };

        let planar = self
            .decoder
            .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)
            .map_err(wrap)?
            == Some(PLANAR_SEPARATE);
        let mut result = DecodingResult::U8(Vec::new());
        self.decoder
            .read_image_to_buffer(&mut result)
            .map_err(wrap)?;

        let samples = widen_samples(result);
        let pixels = self.width as usize * self.height as usize;
        if pixels == 0 || samples.len() % pixels != 0 {
            return Err(GeococoError::UnsupportedRaster {
                path,
                message: format!(
                    "{} samples do not fill a {}x{} grid",
                    samples.len(),
                    self.width,
                    self.height
                ),
            });
        }

        Ok(split_planes(samples, pixels, planar))
    }
}

fn widen_samples(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F16(v) => v.into_iter().map(|s| s.to_f32()).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f32).collect(),
    }
}

/// Splits decoded samples into bands, either band-sequential (`planar`) or
/// pixel-interleaved.
fn split_planes(samples: Vec<f32>, pixels: usize, planar: bool) -> Vec<Vec<f32>> {
    let bands = samples.len() / pixels;
    if bands == 1 {
        return vec![samples];
    }
    if planar {
        return samples.chunks_exact(pixels).map(<[f32]>::to_vec).collect();
    }

    let mut planes = vec![Vec::with_capacity(pixels); bands];
    for pixel in samples.chunks_exact(bands) {
        for (plane, value) in planes.iter_mut().zip(pixel) {
            plane.push(*value);
        }
    }
    planes
}
