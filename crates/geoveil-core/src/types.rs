//! Plaintext ring and ciphertext polygon types
//!
//! Rings are stored closed: the last point repeats the first, as in GeoJSON.
//! An open ring handed to [`GeoRing::new`] is closed on construction, so both
//! input conventions produce the same ring. Point counts everywhere in the
//! crate refer to this closed form.

use geo::{Centroid, Coord, LineString, Polygon};
use num_bigint::BigUint;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_POLYGON_POINTS, MIN_POLYGON_POINTS};
use crate::{Error, Result};

/// Longitude/latitude in degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<Coord<f64>> for GeoPoint {
    fn from(c: Coord<f64>) -> Self {
        Self { lon: c.x, lat: c.y }
    }
}

impl From<GeoPoint> for Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

/// A closed polygon boundary in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRing {
    points: Vec<GeoPoint>,
}

impl GeoRing {
    /// Build a ring from points, closing it if the input is open
    ///
    /// Requires at least three positions and finite coordinates. Degeneracy
    /// beyond that (repeated vertices, zero area, self-intersection) is the
    /// winding normalizer's concern.
    pub fn new(mut points: Vec<GeoPoint>) -> Result<Self> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::MalformedGeometry("ring contains a non-finite coordinate".into()));
        }
        if let (Some(first), Some(last)) = (points.first().copied(), points.last()) {
            if first != *last {
                points.push(first);
            }
        }
        if points.len() < 4 {
            return Err(Error::MalformedGeometry(format!(
                "ring needs at least 3 vertices, got {}",
                points.len().saturating_sub(1)
            )));
        }
        Ok(Self { points })
    }

    /// Build a ring from GeoJSON positions (`[lon, lat]` or `[lon, lat, alt]`)
    pub fn from_positions(positions: &[Vec<f64>]) -> Result<Self> {
        let points = positions
            .iter()
            .map(|pos| match pos.as_slice() {
                [lon, lat, ..] => Ok(GeoPoint::new(*lon, *lat)),
                _ => Err(Error::MalformedGeometry(format!(
                    "position must have at least 2 values, got {}",
                    pos.len()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(points)
    }

    /// Closed point sequence (last equals first)
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Vertices without the closing duplicate
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.points[..self.points.len() - 1]
    }

    /// Closed-ring point count
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of distinct vertices
    pub fn distinct_vertex_count(&self) -> usize {
        let mut seen: Vec<GeoPoint> = Vec::with_capacity(self.points.len());
        for p in self.vertices() {
            if !seen.contains(p) {
                seen.push(*p);
            }
        }
        seen.len()
    }

    /// Same ring traversed in the opposite direction
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Planar centroid in degrees
    pub fn centroid(&self) -> Result<GeoPoint> {
        self.to_polygon()
            .centroid()
            .map(|p| GeoPoint::new(p.x(), p.y()))
            .ok_or_else(|| Error::GeometryError("ring has no centroid".into()))
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        self.points.iter().map(|p| Coord::from(*p)).collect()
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(self.to_line_string(), vec![])
    }

    /// Rebuild a ring from a geo line string
    pub fn from_line_string(ls: &LineString<f64>) -> Result<Self> {
        Self::new(ls.coords().map(|c| GeoPoint::from(*c)).collect())
    }
}

/// One encrypted vertex: order-preserving ciphertexts for both axes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncryptedPoint {
    pub lon: BigUint,
    pub lat: BigUint,
}

impl EncryptedPoint {
    pub fn new(lon: BigUint, lat: BigUint) -> Self {
        Self { lon, lat }
    }
}

// Ciphertexts reach 2^256 - 1, so they travel as decimal strings: ["<lon>", "<lat>"]
impl Serialize for EncryptedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.lon.to_str_radix(10))?;
        tup.serialize_element(&self.lat.to_str_radix(10))?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for EncryptedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PointVisitor;

        impl<'de> Visitor<'de> for PointVisitor {
            type Value = EncryptedPoint;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a pair of decimal strings")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
                let lon: String = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let lat: String = seq.next_element()?.ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let parse = |s: &str| {
                    BigUint::parse_bytes(s.as_bytes(), 10)
                        .ok_or_else(|| de::Error::custom(format!("invalid decimal ciphertext: {s:?}")))
                };
                Ok(EncryptedPoint::new(parse(&lon)?, parse(&lat)?))
            }
        }

        deserializer.deserialize_tuple(2, PointVisitor)
    }
}

/// Encrypted ring; always between 4 and 50 points (closed form)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPolygon {
    points: Vec<EncryptedPoint>,
}

impl EncryptedPolygon {
    pub fn new(points: Vec<EncryptedPoint>) -> Result<Self> {
        if !(MIN_POLYGON_POINTS..=MAX_POLYGON_POINTS).contains(&points.len()) {
            return Err(Error::InvalidPolygon {
                min: MIN_POLYGON_POINTS,
                max: MAX_POLYGON_POINTS,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[EncryptedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<EncryptedPoint> {
        self.points
    }
}
