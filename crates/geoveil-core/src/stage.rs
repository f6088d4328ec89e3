//! Pipeline stage identifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of the per-feature pipeline state machine
///
/// A feature moves strictly forward:
/// `Received -> Normalized -> Projected -> Shrunk -> Simplified -> DomainChecked -> Encoded -> Assembled`.
/// A failure at any stage terminates the feature; the stage that failed is
/// reported alongside the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Ring decoded from the request
    Received,
    /// Winding order fixed to the right-hand rule
    Normalized,
    /// Projected into the local UTM zone
    Projected,
    /// Inward offset applied
    Shrunk,
    /// Vertex count reduced to the cap
    Simplified,
    /// Every vertex mapped into the cipher domain
    DomainChecked,
    /// Every vertex encrypted
    Encoded,
    /// Output feature built
    Assembled,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 8] = [
        Stage::Received,
        Stage::Normalized,
        Stage::Projected,
        Stage::Shrunk,
        Stage::Simplified,
        Stage::DomainChecked,
        Stage::Encoded,
        Stage::Assembled,
    ];

    /// Stable label used in logs, metrics and error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Normalized => "normalized",
            Stage::Projected => "projected",
            Stage::Shrunk => "shrunk",
            Stage::Simplified => "simplified",
            Stage::DomainChecked => "domain_checked",
            Stage::Encoded => "encoded",
            Stage::Assembled => "assembled",
        }
    }

    /// Returns true for the successful terminal stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Assembled)
    }

    /// The stage that follows this one, if any
    pub fn next(&self) -> Option<Stage> {
        let idx = Self::ALL.iter().position(|s| s == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
