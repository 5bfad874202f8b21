//! ### Geo
//! Boundary polygons keyed by the GeoJSON `NAME` property, the join check
//! against the registered load regions, and the one-off filter that cuts a
//! nationwide state file down to New England.

use crate::error::{Error, JoinMismatch, Result};
use crate::region::RegionRegistry;
use anyhow::anyhow;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
};

pub const NEW_ENGLAND_STATES: [&str; 6] = [
    "Maine",
    "New Hampshire",
    "Vermont",
    "Massachusetts",
    "Rhode Island",
    "Connecticut",
];

/// Closed `(lon, lat)` ring.
pub type Ring = Vec<(f64, f64)>;

/// Every polygon of a boundary; each polygon is its exterior ring
/// followed by any holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub polygons: Vec<Vec<Ring>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Bounds {
    fn point(lon: f64, lat: f64) -> Self {
        Self {
            lon_min: lon,
            lon_max: lon,
            lat_min: lat,
            lat_max: lat,
        }
    }

    fn union(self, other: Bounds) -> Self {
        Self {
            lon_min: self.lon_min.min(other.lon_min),
            lon_max: self.lon_max.max(other.lon_max),
            lat_min: self.lat_min.min(other.lat_min),
            lat_max: self.lat_max.max(other.lat_max),
        }
    }
}

impl Geometry {
    pub fn exteriors(&self) -> impl Iterator<Item = &Ring> {
        self.polygons.iter().filter_map(|rings| rings.first())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.exteriors()
            .flatten()
            .map(|&(lon, lat)| Bounds::point(lon, lat))
            .reduce(Bounds::union)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeoBoundaries {
    shapes: BTreeMap<String, Geometry>,
}

impl GeoBoundaries {
    pub fn get(&self, name: &str) -> Option<&Geometry> {
        self.shapes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Geometry)> {
        self.shapes.iter().map(|(name, shape)| (name.as_str(), shape))
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.shapes
            .values()
            .filter_map(Geometry::bounds)
            .reduce(Bounds::union)
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: Option<Properties>,
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
struct Properties {
    #[serde(rename = "NAME")]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

pub fn load_boundaries(path: &Path) -> Result<GeoBoundaries> {
    let text = fs::read_to_string(path).map_err(|e| Error::data_load(path, e.to_string()))?;
    parse_boundaries(&text, path)
}

pub fn parse_boundaries(text: &str, source: &Path) -> Result<GeoBoundaries> {
    let collection: FeatureCollection =
        serde_json::from_str(text).map_err(|e| Error::data_load(source, e.to_string()))?;

    let mut shapes: BTreeMap<String, Geometry> = BTreeMap::new();
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let Some(name) = feature.properties.and_then(|p| p.name) else {
            log::debug!("feature {idx} in {} has no NAME, skipping", source.display());
            continue;
        };
        let Some(raw) = feature.geometry else {
            log::debug!("feature {name:?} has no geometry, skipping");
            continue;
        };
        let polygons: std::result::Result<Vec<Vec<Ring>>, String> = match raw.kind.as_str() {
            "Polygon" => parse_polygon(raw.coordinates).map(|polygon| vec![polygon]),
            "MultiPolygon" => serde_json::from_value::<Vec<Value>>(raw.coordinates)
                .map_err(|e| e.to_string())
                .and_then(|parts| parts.into_iter().map(parse_polygon).collect()),
            other => {
                log::debug!("feature {name:?} has {other} geometry, skipping");
                continue;
            }
        };
        let polygons = polygons.map_err(|reason| {
            Error::data_load(source, format!("bad coordinates for {name:?}: {reason}"))
        })?;

        // Repeated names are parts of the same boundary.
        shapes.entry(name).or_default().polygons.extend(polygons);
    }

    log::info!("Loaded {} boundaries from {}", shapes.len(), source.display());
    Ok(GeoBoundaries { shapes })
}

fn parse_polygon(coordinates: Value) -> std::result::Result<Vec<Ring>, String> {
    let rings: Vec<Vec<Vec<f64>>> =
        serde_json::from_value(coordinates).map_err(|e| e.to_string())?;
    rings
        .into_iter()
        .map(|ring| {
            ring.into_iter()
                .map(|position| match position.as_slice() {
                    [lon, lat, ..] => Ok((*lon, *lat)),
                    _ => Err(format!("position {position:?} has fewer than 2 values")),
                })
                .collect()
        })
        .collect()
}

/// Outcome of joining load regions against boundary names. Mismatches
/// are warnings: the map still draws whatever does line up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinReport {
    pub mismatches: Vec<JoinMismatch>,
}

impl JoinReport {
    pub fn check(registry: &RegionRegistry, boundaries: &GeoBoundaries) -> Self {
        let mut mismatches: Vec<JoinMismatch> = registry
            .names()
            .iter()
            .filter(|region| boundaries.get(region).is_none())
            .map(|region| JoinMismatch::MissingGeometry(region.clone()))
            .collect();
        mismatches.extend(
            boundaries
                .names()
                .filter(|name| !registry.contains(name))
                .map(|name| JoinMismatch::MissingLoad(name.to_string())),
        );
        Self { mismatches }
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn log_warnings(&self) {
        for mismatch in &self.mismatches {
            log::warn!("{mismatch}");
        }
    }
}

/// Keeps the features whose `properties.NAME` is in `keep`, copied as-is.
pub fn filter_collection(collection: &Value, keep: &[&str]) -> anyhow::Result<Value> {
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("input is not a FeatureCollection"))?;

    let kept: Vec<Value> = features
        .iter()
        .filter(|feature| {
            feature
                .pointer("/properties/NAME")
                .and_then(Value::as_str)
                .is_some_and(|name| keep.contains(&name))
        })
        .cloned()
        .collect();

    Ok(json!({
        "type": "FeatureCollection",
        "features": kept,
    }))
}

pub fn filter_geojson_file(input: &Path, output: &Path, keep: &[&str]) -> anyhow::Result<usize> {
    let collection: Value = serde_json::from_reader(BufReader::new(File::open(input)?))?;
    let filtered = filter_collection(&collection, keep)?;
    let count = filtered["features"].as_array().map_or(0, Vec::len);
    serde_json::to_writer_pretty(BufWriter::new(File::create(output)?), &filtered)?;
    log::info!(
        "Kept {count} features from {}, written to {}",
        input.display(),
        output.display()
    );
    Ok(count)
}
