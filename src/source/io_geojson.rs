//! GeoJSON reader for polygon layers.
//!
//! Accepts a `FeatureCollection`, a single `Feature`, or a bare geometry.
//! `Polygon` and `MultiPolygon` geometries become features, including those
//! nested in a `GeometryCollection`. Every other geometry type, and features
//! with a null geometry, are skipped with a warning.
//!
//! Positions may carry a third (elevation) value; it is ignored.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geo::{LineString, MultiPolygon, Polygon};
use log::{debug, warn};
use serde::Deserialize;

use super::vector::{Feature, VectorLayer};
use crate::error::GeococoError;

type Position = Vec<f64>;
type Ring = Vec<Position>;

/// Any GeoJSON object. Fields not used by a given `type` stay at their
/// defaults.
#[derive(Debug, Deserialize)]
struct GeoJsonObject {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    features: Vec<GeoJsonObject>,

    #[serde(default)]
    geometry: Option<Box<GeoJsonObject>>,

    #[serde(default)]
    geometries: Vec<GeoJsonObject>,

    #[serde(default)]
    coordinates: serde_json::Value,

    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// Reads a GeoJSON file into a layer named after the file stem.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid GeoJSON, or
/// holds polygon coordinates of the wrong shape.
pub fn read_geojson_layer(path: &Path) -> Result<VectorLayer, GeococoError> {
    let file = File::open(path).map_err(GeococoError::Io)?;
    let reader = BufReader::new(file);

    let object: GeoJsonObject =
        serde_json::from_reader(reader).map_err(|source| GeococoError::GeoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let layer = object_to_layer(name, object).map_err(|source| GeococoError::GeoJsonParse {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        "Loaded {} polygon feature(s) from {}",
        layer.len(),
        path.display()
    );
    Ok(layer)
}

/// Reads a layer from a GeoJSON string.
///
/// Useful for testing without file I/O.
pub fn from_geojson_str(name: &str, json: &str) -> Result<VectorLayer, serde_json::Error> {
    let object: GeoJsonObject = serde_json::from_str(json)?;
    object_to_layer(name.to_string(), object)
}

fn object_to_layer(name: String, object: GeoJsonObject) -> Result<VectorLayer, serde_json::Error> {
    let mut features = Vec::new();

    match object.kind.as_str() {
        "FeatureCollection" => {
            for (position, feature) in object.features.into_iter().enumerate() {
                push_feature(&name, position, feature, &mut features)?;
            }
        }
        "Feature" => push_feature(&name, 0, object, &mut features)?,
        _ => {
            if let Some(geometry) = geometry_to_multi_polygon(&name, 0, object)? {
                features.push(Feature::new(0, geometry));
            }
        }
    }

    Ok(VectorLayer::new(name, features))
}

fn push_feature(
    layer: &str,
    position: usize,
    feature: GeoJsonObject,
    out: &mut Vec<Feature>,
) -> Result<(), serde_json::Error> {
    let id = feature.id.as_ref().map(id_to_string);

    let Some(geometry) = feature.geometry else {
        warn!("Layer '{}': feature #{} has no geometry, skipping", layer, position);
        return Ok(());
    };

    if let Some(geometry) = geometry_to_multi_polygon(layer, position, *geometry)? {
        // Index is the position among kept features so it addresses the layer.
        let mut kept = Feature::new(out.len(), geometry);
        kept.id = id;
        out.push(kept);
    }
    Ok(())
}

fn geometry_to_multi_polygon(
    layer: &str,
    position: usize,
    geometry: GeoJsonObject,
) -> Result<Option<MultiPolygon<f64>>, serde_json::Error> {
    let polygons = match geometry.kind.as_str() {
        "Polygon" => {
            let rings: Vec<Ring> = serde_json::from_value(geometry.coordinates)?;
            rings_to_polygon(rings).into_iter().collect()
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<Ring>> = serde_json::from_value(geometry.coordinates)?;
            polygons.into_iter().filter_map(rings_to_polygon).collect()
        }
        "GeometryCollection" => {
            let mut polygons = Vec::new();
            for member in geometry.geometries {
                if let Some(mp) = geometry_to_multi_polygon(layer, position, member)? {
                    polygons.extend(mp.0);
                }
            }
            polygons
        }
        other => {
            warn!(
                "Layer '{}': feature #{} has unsupported geometry type '{}', skipping",
                layer, position, other
            );
            return Ok(None);
        }
    };

    if polygons.is_empty() {
        warn!("Layer '{}': feature #{} has an empty polygon geometry, skipping", layer, position);
        return Ok(None);
    }

    Ok(Some(MultiPolygon::new(polygons)))
}

fn rings_to_polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(ring_to_line_string);
    let exterior = rings.next()?;
    if exterior.0.is_empty() {
        return None;
    }
    Some(Polygon::new(exterior, rings.collect()))
}

fn ring_to_line_string(ring: Ring) -> LineString<f64> {
    ring.into_iter()
        .filter(|position| position.len() >= 2)
        .map(|position| (position[0], position[1]))
        .collect::<Vec<_>>()
        .into()
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
