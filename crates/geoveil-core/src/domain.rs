//! Domain transform: degrees to bounded non-negative micro-degrees

use crate::error::Axis;
use crate::types::{GeoPoint, GeoRing};
use crate::{Error, Result};

/// Scale between degrees and cipher-domain units
pub const MICRO_DEGREES: f64 = 1_000_000.0;

/// Largest transformed longitude: (180 + 180) * 1e6
pub const LON_DOMAIN_MAX: u64 = 360_000_000;

/// Largest transformed latitude: (90 + 90) * 1e6
pub const LAT_DOMAIN_MAX: u64 = 180_000_000;

/// `round((lon + 180) * 1e6)`, checked against [0, 360_000_000]
pub fn transform_lon(lon: f64) -> Result<u64> {
    scale(lon, 180.0, LON_DOMAIN_MAX, Axis::Longitude)
}

/// `round((lat + 90) * 1e6)`, checked against [0, 180_000_000]
pub fn transform_lat(lat: f64) -> Result<u64> {
    scale(lat, 90.0, LAT_DOMAIN_MAX, Axis::Latitude)
}

fn scale(value: f64, offset: f64, max: u64, axis: Axis) -> Result<u64> {
    let scaled = ((value + offset) * MICRO_DEGREES).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > max as f64 {
        return Err(Error::OutOfDomain { axis, value: scaled, max });
    }
    Ok(scaled as u64)
}

/// Transformed (lon, lat) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainPoint {
    pub lon: u64,
    pub lat: u64,
}

pub fn transform_point(point: GeoPoint) -> Result<DomainPoint> {
    Ok(DomainPoint {
        lon: transform_lon(point.lon)?,
        lat: transform_lat(point.lat)?,
    })
}

/// Transform every point of a ring, failing on the first out-of-range value
pub fn transform_ring(ring: &GeoRing) -> Result<Vec<DomainPoint>> {
    ring.points().iter().map(|p| transform_point(*p)).collect()
}
