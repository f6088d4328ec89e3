//! geoveil-core: Coordinate-privacy pipeline for agricultural field polygons
//!
//! Each submitted polygon is normalized, shrunk inward, simplified to a
//! bounded vertex count, and every vertex is then encrypted with an
//! order-preserving cipher. A downstream party can compare encrypted
//! coordinates (east/west, north/south) without learning where the field is.
//!
//! # Privacy Model
//!
//! ## What the Consumer Learns
//!
//! | Information | Consumer Knowledge |
//! |-------------|--------------------|
//! | Exact vertex coordinates | NO - order-preserving ciphertext only |
//! | Relative order of vertices per axis | **YES** - property of the cipher |
//! | Area in hectares (pre-shrink) | **YES** - published |
//! | Coarse location (H3 cell, country) | **YES** - published |
//! | Vertex count (4..=50) | **YES** - visible in output |
//!
//! ## Trade-off
//!
//! - **Privacy cost**: order leaks, plus the public bucket narrows location to one coarse cell
//! - **Utility gain**: range and overlap checks work directly on ciphertext
//!
//! Cipher keys and plaintext coordinates are never logged or persisted.

mod config;
mod error;
mod stage;

pub mod domain;
pub mod feature;
pub mod geometry;
pub mod metadata;
pub mod ope;
pub mod pipeline;
pub mod projection;
pub mod types;
pub mod winding;

pub use config::{PipelineConfig, PROTOCOL_VERSION};
pub use error::{Axis, Error, FeatureError, StageError};
pub use feature::{
    EncryptedFeature, EncryptedFeatureCollection, EncryptedProperties, Feature,
    FeatureCollection, FeatureProperties,
};
pub use metadata::{Geocoder, MetadataResolver, SpatialIndexer, SpatialMetadata};
pub use ope::{CipherKey, CipherPair, CipherProfile};
pub use pipeline::{Pipeline, PreparedRing};
pub use stage::Stage;
pub use types::{EncryptedPoint, EncryptedPolygon, GeoPoint, GeoRing};

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline constants
pub mod constants {
    /// Default inward offset in meters
    pub const DEFAULT_SHRINK_DISTANCE_M: f64 = 10.0;

    /// Default cap on closed-ring points before simplification kicks in
    pub const DEFAULT_MAX_POINTS: usize = 20;

    /// Starting simplification tolerance in projected meters
    pub const DEFAULT_INITIAL_TOLERANCE: f64 = 0.01;

    /// Tolerance multiplier per retry
    pub const DEFAULT_TOLERANCE_GROWTH: f64 = 1.5;

    pub const DEFAULT_MAX_SIMPLIFY_RETRIES: u32 = 60;

    /// H3 resolution for the spatial bucket
    pub const DEFAULT_SPATIAL_RESOLUTION: u8 = 1;

    /// Smallest encrypted polygon (closed triangle)
    pub const MIN_POLYGON_POINTS: usize = 4;

    /// Largest encrypted polygon
    pub const MAX_POLYGON_POINTS: usize = 50;
}
