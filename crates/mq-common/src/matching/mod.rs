pub mod regions;
pub mod scoring;
pub mod timeline;
pub mod weights;

pub use scoring::{DimensionResult, MatchEngine, MatchScore, ScoreBreakdown, ScoringConfig};
pub use weights::{MatchWeights, WeightsError, DEFAULT_WEIGHTS};

use serde::{Deserialize, Serialize};

/// Qualitative band derived from the composite score. Never stored; always
/// recomputed from `total_score` so every surface shows the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Excellent,
    Strong,
    Good,
    Fair,
    Low,
}

impl Tier {
    pub fn from_score(total_score: i32) -> Self {
        match total_score {
            s if s >= 90 => Tier::Excellent,
            s if s >= 80 => Tier::Strong,
            s if s >= 70 => Tier::Good,
            s if s >= 60 => Tier::Fair,
            _ => Tier::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Strong => "strong",
            Tier::Good => "good",
            Tier::Fair => "fair",
            Tier::Low => "low",
        }
    }

    /// Minimum total_score for this tier, used by the listing filter.
    pub fn min_score(&self) -> i32 {
        match self {
            Tier::Excellent => 90,
            Tier::Strong => 80,
            Tier::Good => 70,
            Tier::Fair => 60,
            Tier::Low => 0,
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excellent" => Ok(Tier::Excellent),
            "strong" => Ok(Tier::Strong),
            "good" => Ok(Tier::Good),
            "fair" => Ok(Tier::Fair),
            "low" => Ok(Tier::Low),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}
