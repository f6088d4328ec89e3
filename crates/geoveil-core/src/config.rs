//! Pipeline configuration

use serde::{Deserialize, Serialize};

use crate::constants;

/// Protocol version constant
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Tunables for the geometry and encoding stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Inward offset applied before encryption, in meters
    #[serde(default = "default_shrink_distance")]
    pub shrink_distance_m: f64,
    /// Rings with more closed-ring points than this are simplified
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    /// Starting simplification tolerance, in projected meters
    #[serde(default = "default_initial_tolerance")]
    pub initial_tolerance: f64,
    /// Factor applied to the tolerance after each unsuccessful pass
    #[serde(default = "default_tolerance_growth")]
    pub tolerance_growth: f64,
    /// Upper bound on tolerance escalations
    #[serde(default = "default_max_simplify_retries")]
    pub max_simplify_retries: u32,
    /// H3 resolution used for the spatial bucket
    #[serde(default = "default_spatial_resolution")]
    pub spatial_resolution: u8,
    /// Protocol version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_shrink_distance() -> f64 {
    constants::DEFAULT_SHRINK_DISTANCE_M
}

fn default_max_points() -> usize {
    constants::DEFAULT_MAX_POINTS
}

fn default_initial_tolerance() -> f64 {
    constants::DEFAULT_INITIAL_TOLERANCE
}

fn default_tolerance_growth() -> f64 {
    constants::DEFAULT_TOLERANCE_GROWTH
}

fn default_max_simplify_retries() -> u32 {
    constants::DEFAULT_MAX_SIMPLIFY_RETRIES
}

fn default_spatial_resolution() -> u8 {
    constants::DEFAULT_SPATIAL_RESOLUTION
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl PipelineConfig {
    /// Set the shrink distance
    pub fn with_shrink_distance(mut self, meters: f64) -> Self {
        self.shrink_distance_m = meters;
        self
    }

    /// Set the simplification cap
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Reject settings under which the pipeline cannot terminate or cannot
    /// produce a polygon the output invariant accepts
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(crate::Error::InvalidConfig(msg));

        if !self.shrink_distance_m.is_finite() || self.shrink_distance_m < 0.0 {
            return invalid(format!("shrink_distance_m must be >= 0, got {}", self.shrink_distance_m));
        }
        if !(self.initial_tolerance > 0.0) {
            return invalid(format!("initial_tolerance must be > 0, got {}", self.initial_tolerance));
        }
        if !(self.tolerance_growth > 1.0) {
            return invalid(format!("tolerance_growth must be > 1, got {}", self.tolerance_growth));
        }
        if self.max_points < constants::MIN_POLYGON_POINTS || self.max_points > constants::MAX_POLYGON_POINTS {
            return invalid(format!(
                "max_points {} must lie within [{}, {}]",
                self.max_points,
                constants::MIN_POLYGON_POINTS,
                constants::MAX_POLYGON_POINTS
            ));
        }
        if self.spatial_resolution > 15 {
            return invalid(format!("spatial_resolution must be 0..=15, got {}", self.spatial_resolution));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shrink_distance_m: default_shrink_distance(),
            max_points: default_max_points(),
            initial_tolerance: default_initial_tolerance(),
            tolerance_growth: default_tolerance_growth(),
            max_simplify_retries: default_max_simplify_retries(),
            spatial_resolution: default_spatial_resolution(),
            version: default_version(),
        }
    }
}
