use serde::{Deserialize, Serialize};

use crate::matching::MatchWeights;
use crate::rescan::RescanSummary;

/// Single-pair scoring request for the match detail view. Omitted weights
/// fall back to the deployment defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeRequest {
    pub investor_id: i64,
    pub target_id: i64,
    #[serde(default)]
    pub weights: Option<MatchWeights>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RescanRequest {
    #[serde(default)]
    pub weights: Option<MatchWeights>,
    #[serde(default)]
    pub include_dismissed: bool,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescanResponse {
    pub updated_count: u64,
    pub strong_match_count: u64,
    pub skipped_dismissed: u64,
    pub failed_pairs: u64,
    pub cancelled: bool,
}

impl From<RescanSummary> for RescanResponse {
    fn from(summary: RescanSummary) -> Self {
        Self {
            updated_count: summary.updated_count,
            strong_match_count: summary.strong_match_count,
            skipped_dismissed: summary.skipped_dismissed,
            failed_pairs: summary.failed_pairs,
            cancelled: summary.cancelled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    /// One of: review (alias approve), dismiss, convert.
    pub action: String,
    /// Optional; the API falls back to the authenticated subject.
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub deal_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters for the clustered match listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub min_score: Option<i32>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// "investor" (default) or "target".
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}
