//! GeoJSON layer reader/writer
//!
//! Layers are GeoJSON FeatureCollections on disk. Reading converts every
//! feature into the core model; attributes keep their JSON types where a
//! flat mapping exists (nested values are stored as their JSON text).

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Read a GeoJSON file into a feature collection.
///
/// Accepts a FeatureCollection, a single Feature, or a bare Geometry.
pub fn read_layer(path: &Path) -> Result<FeatureCollection> {
    let contents = fs::read_to_string(path)?;
    let gj: GeoJson = contents.parse::<GeoJson>()?;

    let mut out = FeatureCollection::new();
    match gj {
        GeoJson::FeatureCollection(fc) => {
            for feature in fc.features {
                out.push(convert_feature(feature)?);
            }
        }
        GeoJson::Feature(feature) => out.push(convert_feature(feature)?),
        GeoJson::Geometry(geom) => {
            let geometry = geo_types::Geometry::<f64>::try_from(&geom)?;
            out.push(Feature::new(geometry));
        }
    }

    debug!(features = out.len(), path = %path.display(), "read layer");
    Ok(out)
}

/// Read a layer and keep only point-kind features.
///
/// Errors if nothing point-like remains.
pub fn read_point_layer(path: &Path) -> Result<FeatureCollection> {
    let mut layer = read_layer(path)?;
    layer.retain_points();
    if layer.is_empty() {
        return Err(Error::EmptyLayer(format!(
            "{} (no point features)",
            path.display()
        )));
    }
    Ok(layer)
}

/// Read a layer and keep only line-kind features.
///
/// Errors if nothing line-like remains.
pub fn read_line_layer(path: &Path) -> Result<FeatureCollection> {
    let mut layer = read_layer(path)?;
    layer.retain_lines();
    if layer.is_empty() {
        return Err(Error::EmptyLayer(format!(
            "{} (no line features)",
            path.display()
        )));
    }
    Ok(layer)
}

/// Write a feature collection as a GeoJSON FeatureCollection.
pub fn write_layer(layer: &FeatureCollection, path: &Path) -> Result<()> {
    let features: Vec<geojson::Feature> = layer
        .iter()
        .map(|f| {
            let geometry = f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g)));
            let properties: JsonObject = f
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect();
            geojson::Feature {
                bbox: None,
                geometry,
                id: f.id.clone().map(Id::String),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    fs::write(path, GeoJson::from(fc).to_string())?;
    Ok(())
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = feature
        .geometry
        .as_ref()
        .map(geo_types::Geometry::<f64>::try_from)
        .transpose()?;

    let mut out = Feature {
        geometry,
        properties: Default::default(),
        id: feature.id.map(|id| match id {
            Id::String(s) => s,
            Id::Number(n) => n.to_string(),
        }),
    };

    if let Some(props) = feature.properties {
        for (key, value) in props {
            out.properties.insert(key, json_to_attribute(value));
        }
    }
    Ok(out)
}

fn json_to_attribute(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttributeValue::Int(i)
            } else {
                AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => AttributeValue::String(s),
        // Nested values have no flat equivalent; keep their JSON text
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => JsonValue::from(*f),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}
