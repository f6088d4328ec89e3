//! Error types for geoveil-core

use thiserror::Error;

use crate::Stage;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Geometry error: {0}")]
    GeometryError(String),

    #[error("Shrinking by {distance} m collapsed the polygon")]
    ShrinkCollapsed { distance: f64 },

    #[error("Simplify did not reach {max_points} points after {retries} retries (last count {last_count})")]
    SimplifyDidNotConverge {
        max_points: usize,
        retries: u32,
        last_count: usize,
    },

    #[error("{axis} value {value} is outside the cipher domain [0, {max}]")]
    OutOfDomain { axis: Axis, value: f64, max: u64 },

    #[error("Metadata lookup failed: {0}")]
    MetadataLookupFailed(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Polygon must have between {min} and {max} points, got {actual}")]
    InvalidPolygon { min: usize, max: usize, actual: usize },

    #[error("Invalid cipher key: {0}")]
    InvalidKey(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Stable snake_case identifier for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::MalformedGeometry(_) => "malformed_geometry",
            Error::GeometryError(_) => "geometry_error",
            Error::ShrinkCollapsed { .. } => "shrink_collapsed",
            Error::SimplifyDidNotConverge { .. } => "simplify_did_not_converge",
            Error::OutOfDomain { .. } => "out_of_domain",
            Error::MetadataLookupFailed(_) => "metadata_lookup_failed",
            Error::EncodingFailed(_) => "encoding_failed",
            Error::InvalidPolygon { .. } => "invalid_polygon",
            Error::InvalidKey(_) => "invalid_key",
            Error::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Metadata misses degrade to an empty value; everything else aborts the feature
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::MetadataLookupFailed(_))
    }

    /// True when the failure stems from the submitted geometry rather than the service
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::Json(_)
                | Error::MalformedGeometry(_)
                | Error::GeometryError(_)
                | Error::ShrinkCollapsed { .. }
                | Error::OutOfDomain { .. }
                | Error::InvalidPolygon { .. }
        )
    }
}

/// Coordinate axis, used to label domain errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Longitude,
    Latitude,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Longitude => write!(f, "longitude"),
            Axis::Latitude => write!(f, "latitude"),
        }
    }
}

/// An error tagged with the pipeline stage that produced it
#[derive(Error, Debug)]
#[error("{stage}: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl StageError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }

    /// Closure for `map_err` that tags an error with `stage`
    pub fn at(stage: Stage) -> impl FnOnce(Error) -> StageError {
        move |source| StageError { stage, source }
    }
}

/// A pipeline failure for one feature
#[derive(Error, Debug)]
#[error("feature {feature_id:?} failed at {stage}: {source}")]
pub struct FeatureError {
    pub feature_id: String,
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl FeatureError {
    pub fn new(feature_id: impl Into<String>, stage: Stage, source: Error) -> Self {
        Self {
            feature_id: feature_id.into(),
            stage,
            source,
        }
    }

    pub fn from_stage(feature_id: impl Into<String>, err: StageError) -> Self {
        Self::new(feature_id, err.stage, err.source)
    }
}
