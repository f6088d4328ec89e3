//! GeoJSON-shaped request and response documents

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EncryptedPoint, EncryptedPolygon, GeoRing};
use crate::{Error, Result};

pub const POLYGON: &str = "Polygon";
pub const FEATURE_COLLECTION: &str = "FeatureCollection";
pub const ENCRYPTED_FEATURE: &str = "EncryptedFeature";
pub const ENCRYPTED_FEATURE_COLLECTION: &str = "EncryptedFeatureCollection";

/// Incoming feature collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

fn feature_collection_type() -> String {
    FEATURE_COLLECTION.to_string()
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_type(),
            features,
        }
    }
}

/// Incoming feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub id: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: FeatureProperties,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    /// Polygon feature from a single exterior ring of `[lon, lat]` pairs
    pub fn polygon(id: impl Into<String>, ring: &[[f64; 2]], properties: FeatureProperties) -> Self {
        let positions: Vec<Vec<f64>> = ring.iter().map(|p| p.to_vec()).collect();
        Self {
            kind: feature_type(),
            id: id.into(),
            geometry: Geometry {
                kind: POLYGON.to_string(),
                coordinates: serde_json::json!([positions]),
            },
            properties,
        }
    }
}

/// Untyped GeoJSON geometry; only `Polygon` is processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Value,
}

impl Geometry {
    pub fn is_polygon(&self) -> bool {
        self.kind == POLYGON
    }

    /// The exterior ring of a hole-free polygon
    pub fn exterior_ring(&self) -> Result<GeoRing> {
        if !self.is_polygon() {
            return Err(Error::MalformedGeometry(format!("expected Polygon, got {}", self.kind)));
        }
        let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(self.coordinates.clone())
            .map_err(|e| Error::MalformedGeometry(format!("invalid polygon coordinates: {e}")))?;
        match rings.as_slice() {
            [] => Err(Error::MalformedGeometry("polygon has no rings".into())),
            [exterior] => GeoRing::from_positions(exterior),
            _ => Err(Error::MalformedGeometry(format!(
                "polygons with holes are not supported ({} rings)",
                rings.len()
            ))),
        }
    }
}

/// Pass-through time range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub start_at: Value,
    #[serde(default)]
    pub end_at: Value,
}

impl FeatureProperties {
    pub fn new(start_at: impl Into<Value>, end_at: impl Into<Value>) -> Self {
        Self {
            start_at: start_at.into(),
            end_at: end_at.into(),
        }
    }
}

/// Outgoing collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedFeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<EncryptedFeature>,
}

impl EncryptedFeatureCollection {
    pub fn new(features: Vec<EncryptedFeature>) -> Self {
        Self {
            kind: ENCRYPTED_FEATURE_COLLECTION.to_string(),
            features,
        }
    }
}

/// Outgoing feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub properties: EncryptedProperties,
    pub geometry: EncryptedGeometry,
}

impl EncryptedFeature {
    pub fn new(id: String, properties: EncryptedProperties, polygon: EncryptedPolygon) -> Self {
        Self {
            kind: ENCRYPTED_FEATURE.to_string(),
            id,
            properties,
            geometry: EncryptedGeometry::from(polygon),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedProperties {
    pub area_hectares: f64,
    pub spatial_bucket: String,
    pub country: String,
    pub start_at: Value,
    pub end_at: Value,
}

/// `{"type": "Polygon", "coordinates": [[["<lon>", "<lat>"], ...]]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<EncryptedPoint>>,
}

impl EncryptedGeometry {
    /// Recover the polygon, re-checking the point-count invariant
    pub fn polygon(&self) -> Result<EncryptedPolygon> {
        match self.coordinates.as_slice() {
            [ring] => EncryptedPolygon::new(ring.clone()),
            _ => Err(Error::MalformedGeometry(format!(
                "expected one ring, got {}",
                self.coordinates.len()
            ))),
        }
    }
}

impl From<EncryptedPolygon> for EncryptedGeometry {
    fn from(polygon: EncryptedPolygon) -> Self {
        Self {
            kind: POLYGON.to_string(),
            coordinates: vec![polygon.into_points()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn test_parse_request() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "field-1",
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0,0.01],[0.01,0.01],[0.01,0],[0,0]]]},
                "properties": {"start_at": "2024-01-01", "end_at": null}
            }]
        }"#;
        let fc: FeatureCollection = serde_json::from_str(body).unwrap();
        let feature = &fc.features[0];
        assert_eq!(feature.id, "field-1");
        assert_eq!(feature.properties.start_at, Value::from("2024-01-01"));
        assert_eq!(feature.properties.end_at, Value::Null);
        assert_eq!(feature.geometry.exterior_ring().unwrap().len(), 5);
    }

    #[test]
    fn test_missing_properties_default_to_null() {
        let body = r#"{"id": "x", "geometry": {"type": "Point", "coordinates": [1, 2]}}"#;
        let feature: Feature = serde_json::from_str(body).unwrap();
        assert_eq!(feature.properties, FeatureProperties::default());
        assert!(!feature.geometry.is_polygon());
    }

    #[test]
    fn test_holes_rejected() {
        let geometry = Geometry {
            kind: POLYGON.into(),
            coordinates: serde_json::json!([
                [[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]],
                [[1, 1], [2, 1], [2, 2], [1, 1]]
            ]),
        };
        let err = geometry.exterior_ring().unwrap_err();
        assert!(err.to_string().contains("holes"));
    }

    #[test]
    fn test_bad_coordinates_rejected() {
        let geometry = Geometry {
            kind: POLYGON.into(),
            coordinates: serde_json::json!([["a", "b"]]),
        };
        assert!(matches!(geometry.exterior_ring(), Err(Error::MalformedGeometry(_))));
    }

    #[test]
    fn test_encrypted_feature_shape() {
        let points: Vec<EncryptedPoint> = (1..=4u32)
            .map(|i| EncryptedPoint::new(BigUint::from(i), BigUint::from(i * 10)))
            .collect();
        let feature = EncryptedFeature::new(
            "f".into(),
            EncryptedProperties {
                area_hectares: 1.5,
                spatial_bucket: "81583ffffffffff".into(),
                country: "France".into(),
                start_at: Value::Null,
                end_at: Value::Null,
            },
            EncryptedPolygon::new(points).unwrap(),
        );
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "EncryptedFeature");
        assert_eq!(json["geometry"]["type"], "Polygon");
        assert_eq!(json["geometry"]["coordinates"][0][2][1], "30");
        assert_eq!(json["properties"]["spatial_bucket"], "81583ffffffffff");

        let back: EncryptedFeature = serde_json::from_value(json).unwrap();
        assert_eq!(back.geometry.polygon().unwrap().len(), 4);
    }
}
