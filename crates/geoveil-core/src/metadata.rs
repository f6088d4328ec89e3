//! Public metadata derived from the plaintext centroid
//!
//! The spatial bucket (an H3 cell) and the country are the only location
//! information that survives the pipeline in the clear. Both lookups sit
//! behind traits so deployments can swap in remote services and tests can
//! use fixed answers.

use h3o::{LatLng, Resolution};
use reverse_geocoder::ReverseGeocoder;

use crate::types::GeoPoint;
use crate::{Error, Result};

/// Hierarchical spatial index: centroid to a fixed-resolution cell id
pub trait SpatialIndexer: Send + Sync {
    fn cell(&self, centroid: GeoPoint) -> Result<String>;
}

/// Reverse geocoder: centroid to a country name, `None` on a miss
pub trait Geocoder: Send + Sync {
    fn country(&self, centroid: GeoPoint) -> Result<Option<String>>;
}

/// H3 cells at a fixed resolution
#[derive(Debug, Clone, Copy)]
pub struct H3Indexer {
    resolution: Resolution,
}

impl H3Indexer {
    pub fn new(resolution: u8) -> Result<Self> {
        let resolution = Resolution::try_from(resolution)
            .map_err(|e| Error::InvalidConfig(format!("invalid H3 resolution {resolution}: {e}")))?;
        Ok(Self { resolution })
    }
}

impl SpatialIndexer for H3Indexer {
    fn cell(&self, centroid: GeoPoint) -> Result<String> {
        let ll = LatLng::new(centroid.lat, centroid.lon)
            .map_err(|e| Error::MetadataLookupFailed(format!("invalid centroid for H3: {e}")))?;
        Ok(ll.to_cell(self.resolution).to_string())
    }
}

/// Offline nearest-place geocoder over the bundled GeoNames city table
pub struct OfflineGeocoder {
    inner: ReverseGeocoder,
}

impl OfflineGeocoder {
    /// Loads the embedded place table; do this once at startup
    pub fn new() -> Self {
        Self {
            inner: ReverseGeocoder::new(),
        }
    }
}

impl Default for OfflineGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Geocoder for OfflineGeocoder {
    fn country(&self, centroid: GeoPoint) -> Result<Option<String>> {
        let found = self.inner.search((centroid.lat, centroid.lon));
        let code = found.record.cc.trim();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(Some(country_name(code)))
    }
}

/// English short name for an ISO 3166-1 alpha-2 code; unknown codes pass through
pub fn country_name(alpha2: &str) -> String {
    match isocountry::CountryCode::for_alpha2(alpha2) {
        Ok(code) => code.name().to_string(),
        Err(_) => alpha2.to_string(),
    }
}

/// Metadata attached to every encrypted feature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpatialMetadata {
    pub spatial_bucket: String,
    pub country: String,
}

/// Runs both lookups; failures degrade to empty strings
pub struct MetadataResolver {
    indexer: Box<dyn SpatialIndexer>,
    geocoder: Box<dyn Geocoder>,
}

impl MetadataResolver {
    pub fn new(indexer: Box<dyn SpatialIndexer>, geocoder: Box<dyn Geocoder>) -> Self {
        Self { indexer, geocoder }
    }

    /// H3 at `resolution` plus the offline geocoder
    pub fn offline(resolution: u8) -> Result<Self> {
        Ok(Self::new(
            Box::new(H3Indexer::new(resolution)?),
            Box::new(OfflineGeocoder::new()),
        ))
    }

    pub fn resolve(&self, centroid: GeoPoint) -> SpatialMetadata {
        let spatial_bucket = match self.indexer.cell(centroid) {
            Ok(cell) => cell,
            Err(e) => {
                tracing::warn!(kind = e.kind(), "spatial bucket lookup failed, leaving it empty");
                String::new()
            }
        };

        let country = match self.geocoder.country(centroid) {
            Ok(Some(name)) => name,
            Ok(None) => {
                tracing::warn!("no country found for centroid");
                String::new()
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), "country lookup failed, leaving it empty");
                String::new()
            }
        };

        SpatialMetadata {
            spatial_bucket,
            country,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingIndexer;

    impl SpatialIndexer for FailingIndexer {
        fn cell(&self, _: GeoPoint) -> Result<String> {
            Err(Error::MetadataLookupFailed("index offline".into()))
        }
    }

    struct NoCountry;

    impl Geocoder for NoCountry {
        fn country(&self, _: GeoPoint) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[test]
    fn test_h3_resolution_one() {
        let indexer = H3Indexer::new(1).unwrap();
        let cell = indexer.cell(GeoPoint::new(4.9, 52.37)).unwrap();
        assert_eq!(cell.len(), 15);
        assert!(cell.starts_with("81"));

        let same = indexer.cell(GeoPoint::new(4.91, 52.371)).unwrap();
        assert_eq!(cell, same);
    }

    #[test]
    fn test_h3_rejects_bad_resolution() {
        assert!(H3Indexer::new(16).is_err());
    }

    #[test]
    fn test_country_name() {
        assert_eq!(country_name("FR"), "France");
        assert_eq!(country_name("ZZ"), "ZZ");
    }

    #[test]
    fn test_offline_geocoder() {
        let geocoder = OfflineGeocoder::new();
        let country = geocoder.country(GeoPoint::new(2.35, 48.85)).unwrap();
        assert_eq!(country.as_deref(), Some("France"));
    }

    #[test]
    fn test_failures_degrade_to_empty() {
        let resolver = MetadataResolver::new(Box::new(FailingIndexer), Box::new(NoCountry));
        let meta = resolver.resolve(GeoPoint::new(0.0, 0.0));
        assert_eq!(meta, SpatialMetadata::default());
    }
}
