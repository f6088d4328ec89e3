//! Per-feature pipeline
//!
//! Drives each polygon through the stages in [`Stage`] order. Geometry work
//! happens in [`Pipeline::prepare`]; [`Pipeline::encrypt_ring`] maps the
//! prepared ring into the cipher domain and encrypts it. Errors carry the
//! stage they were raised in.

use std::sync::Arc;

use crate::domain;
use crate::feature::{
    EncryptedFeature, EncryptedFeatureCollection, EncryptedProperties, Feature, FeatureCollection,
};
use crate::geometry::{self, SimplifyOptions};
use crate::metadata::{MetadataResolver, SpatialMetadata};
use crate::ope::CipherPair;
use crate::projection::{Projector, UtmZone};
use crate::types::{EncryptedPolygon, GeoRing};
use crate::winding;
use crate::{FeatureError, PipelineConfig, Result, Stage, StageError};

/// Plaintext ring after the geometry stages, ready for encryption
#[derive(Debug, Clone)]
pub struct PreparedRing {
    /// Shrunk and simplified ring in WGS84, counter-clockwise and closed
    pub ring: GeoRing,
    /// Area of the normalized input, before shrinking
    pub area_hectares: f64,
    pub metadata: SpatialMetadata,
    pub zone: UtmZone,
}

/// Shared, immutable pipeline; one per process
pub struct Pipeline {
    config: PipelineConfig,
    ciphers: Arc<CipherPair>,
    metadata: MetadataResolver,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, ciphers: Arc<CipherPair>, metadata: MetadataResolver) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ciphers,
            metadata,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize, project, measure, shrink and simplify one ring
    pub fn prepare(&self, ring: &GeoRing) -> std::result::Result<PreparedRing, StageError> {
        let normalized = winding::normalize(ring).map_err(StageError::at(Stage::Normalized))?;
        tracing::debug!(stage = %Stage::Normalized, points = normalized.len());

        // Reject out-of-range input before projection can wrap it back into range
        domain::transform_ring(&normalized).map_err(StageError::at(Stage::DomainChecked))?;

        let centroid = normalized.centroid().map_err(StageError::at(Stage::Projected))?;
        let projector = Projector::for_centroid(centroid).map_err(StageError::at(Stage::Projected))?;
        let projected = projector
            .project_ring(&normalized)
            .map_err(StageError::at(Stage::Projected))?;
        let area_hectares = geometry::area_hectares(&projected).map_err(StageError::at(Stage::Projected))?;
        tracing::debug!(stage = %Stage::Projected, zone = %projector.zone(), area_hectares);

        let shrunk = geometry::shrink(&projected, self.config.shrink_distance_m)
            .map_err(StageError::at(Stage::Shrunk))?;
        tracing::debug!(stage = %Stage::Shrunk, points = shrunk.len());

        let simplified = geometry::simplify(&shrunk, &SimplifyOptions::from(&self.config))
            .map_err(StageError::at(Stage::Simplified))?;
        let ring = projector
            .unproject_ring(&simplified)
            .map_err(StageError::at(Stage::Simplified))?;
        tracing::debug!(stage = %Stage::Simplified, points = ring.len());

        // Looked up on the input centroid, not the shrunk ring
        let metadata = self.metadata.resolve(centroid);

        Ok(PreparedRing {
            ring,
            area_hectares,
            metadata,
            zone: projector.zone(),
        })
    }

    /// Domain-transform and encrypt every vertex of a prepared ring
    pub fn encrypt_ring(&self, ring: &GeoRing) -> std::result::Result<EncryptedPolygon, StageError> {
        let domain_points = domain::transform_ring(ring).map_err(StageError::at(Stage::DomainChecked))?;

        let encrypted = domain_points
            .into_iter()
            .map(|p| self.ciphers.encrypt_point(p))
            .collect::<Result<Vec<_>>>()
            .map_err(StageError::at(Stage::Encoded))?;

        EncryptedPolygon::new(encrypted).map_err(StageError::at(Stage::Assembled))
    }

    /// Process one feature; non-polygon features yield `Ok(None)`
    pub fn process_feature(&self, feature: &Feature) -> std::result::Result<Option<EncryptedFeature>, FeatureError> {
        if !feature.geometry.is_polygon() {
            tracing::debug!(id = %feature.id, kind = %feature.geometry.kind, "skipping non-polygon feature");
            return Ok(None);
        }

        let span = tracing::debug_span!("feature", id = %feature.id);
        let _enter = span.enter();

        let ring = feature
            .geometry
            .exterior_ring()
            .map_err(|e| FeatureError::new(feature.id.clone(), Stage::Received, e))?;

        let prepared = self
            .prepare(&ring)
            .map_err(|e| FeatureError::from_stage(feature.id.clone(), e))?;
        let polygon = self
            .encrypt_ring(&prepared.ring)
            .map_err(|e| FeatureError::from_stage(feature.id.clone(), e))?;
        tracing::debug!(stage = %Stage::Assembled, points = polygon.len());

        let properties = EncryptedProperties {
            area_hectares: prepared.area_hectares,
            spatial_bucket: prepared.metadata.spatial_bucket,
            country: prepared.metadata.country,
            start_at: feature.properties.start_at.clone(),
            end_at: feature.properties.end_at.clone(),
        };
        Ok(Some(EncryptedFeature::new(feature.id.clone(), properties, polygon)))
    }

    /// Process a whole collection in input order, stopping at the first failure
    pub fn process_collection(
        &self,
        collection: &FeatureCollection,
    ) -> std::result::Result<EncryptedFeatureCollection, FeatureError> {
        let mut features = Vec::with_capacity(collection.features.len());
        for feature in &collection.features {
            if let Some(encrypted) = self.process_feature(feature)? {
                features.push(encrypted);
            }
        }

        tracing::info!(
            received = collection.features.len(),
            encrypted = features.len(),
            "feature collection encrypted"
        );
        Ok(EncryptedFeatureCollection::new(features))
    }
}
