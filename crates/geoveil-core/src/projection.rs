//! Projection selection: a UTM zone per polygon, chosen from its centroid
//!
//! A single global metric projection distorts area badly away from its
//! origin. Picking the UTM zone that contains the centroid keeps scale error
//! within the UTM accuracy band for polygons that fit inside one zone.

use geo::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::fmt;

use crate::types::{GeoPoint, GeoRing};
use crate::{Error, Result};

const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// UTM zone index for a longitude: `floor((lon + 180) / 6) + 1`, clamped to [1, 60]
pub fn utm_zone(lon: f64) -> u8 {
    (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn from_latitude(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }
}

/// A UTM coordinate system (WGS84 datum, meters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    pub zone: u8,
    pub hemisphere: Hemisphere,
}

impl UtmZone {
    /// Zone and hemisphere for a centroid
    pub fn for_centroid(centroid: GeoPoint) -> Self {
        Self {
            zone: utm_zone(centroid.lon),
            hemisphere: Hemisphere::from_latitude(centroid.lat),
        }
    }

    /// PROJ.4 definition of this zone
    pub fn proj4(&self) -> String {
        let south = match self.hemisphere {
            Hemisphere::North => "",
            Hemisphere::South => " +south",
        };
        format!(
            "+proj=utm +zone={}{south} +datum=WGS84 +units=m +no_defs +type=crs",
            self.zone
        )
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let band = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        write!(f, "UTM {}{}", self.zone, band)
    }
}

/// A ring in projected meters; never leaves the geometry stages
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRing {
    pub zone: UtmZone,
    pub coords: Vec<Coord<f64>>,
}

impl ProjectedRing {
    /// Closed-ring point count
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Forward and inverse transforms between WGS84 degrees and one UTM zone
pub struct Projector {
    zone: UtmZone,
    geographic: Proj,
    metric: Proj,
}

impl Projector {
    pub fn new(zone: UtmZone) -> Result<Self> {
        let geographic = Proj::from_proj_string(WGS84_LONGLAT)
            .map_err(|e| Error::GeometryError(format!("failed to build WGS84 definition: {e:?}")))?;
        let definition = zone.proj4();
        let metric = Proj::from_proj_string(&definition)
            .map_err(|e| Error::GeometryError(format!("failed to build {zone} definition: {e:?}")))?;
        Ok(Self {
            zone,
            geographic,
            metric,
        })
    }

    /// Projector for the zone containing `centroid`
    pub fn for_centroid(centroid: GeoPoint) -> Result<Self> {
        if !(-180.0..=180.0).contains(&centroid.lon) || !(-90.0..=90.0).contains(&centroid.lat) {
            return Err(Error::GeometryError("centroid is outside the geographic range".into()));
        }
        Self::new(UtmZone::for_centroid(centroid))
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    /// Degrees to projected meters
    pub fn to_metric(&self, point: GeoPoint) -> Result<Coord<f64>> {
        let mut p = (point.lon.to_radians(), point.lat.to_radians(), 0.0);
        transform(&self.geographic, &self.metric, &mut p)
            .map_err(|e| Error::GeometryError(format!("projection into {} failed: {e:?}", self.zone)))?;
        finite(Coord { x: p.0, y: p.1 }, self.zone)
    }

    /// Projected meters back to degrees
    pub fn to_geographic(&self, coord: Coord<f64>) -> Result<GeoPoint> {
        let mut p = (coord.x, coord.y, 0.0);
        transform(&self.metric, &self.geographic, &mut p)
            .map_err(|e| Error::GeometryError(format!("inverse projection from {} failed: {e:?}", self.zone)))?;
        let back = finite(Coord { x: p.0.to_degrees(), y: p.1.to_degrees() }, self.zone)?;
        Ok(GeoPoint::from(back))
    }

    pub fn project_ring(&self, ring: &GeoRing) -> Result<ProjectedRing> {
        let coords = ring
            .points()
            .iter()
            .map(|p| self.to_metric(*p))
            .collect::<Result<Vec<_>>>()?;
        Ok(ProjectedRing {
            zone: self.zone,
            coords,
        })
    }

    pub fn unproject_ring(&self, ring: &ProjectedRing) -> Result<GeoRing> {
        let points = ring
            .coords
            .iter()
            .map(|c| self.to_geographic(*c))
            .collect::<Result<Vec<_>>>()?;
        GeoRing::new(points)
    }
}

fn finite(c: Coord<f64>, zone: UtmZone) -> Result<Coord<f64>> {
    if c.x.is_finite() && c.y.is_finite() {
        Ok(c)
    } else {
        Err(Error::GeometryError(format!("projection through {zone} produced a non-finite coordinate")))
    }
}
