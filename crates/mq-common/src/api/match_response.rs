use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::MatchStatus;
use crate::matching::Tier;
use crate::MatchRecord;

/// Match record as the review GUI consumes it. The tier is always derived
/// from total_score at response time, never read from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub id: Option<i64>,
    pub investor_id: i64,
    pub target_id: i64,
    pub total_score: i32,
    pub tier: Tier,
    pub industry_score: Option<f64>,
    pub geography_score: Option<f64>,
    pub financial_score: Option<f64>,
    pub profile_score: Option<f64>,
    pub timeline_score: Option<f64>,
    pub transaction_score: Option<f64>,
    pub breakdown: Option<Value>,
    pub status: MatchStatus,
    pub reviewed_by: Option<String>,
    pub deal_id: Option<i64>,
    pub notes: Option<String>,
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
}

impl From<MatchRecord> for MatchResponse {
    fn from(record: MatchRecord) -> Self {
        let tier = record.tier();
        Self {
            id: record.id,
            investor_id: record.investor_id,
            target_id: record.target_id,
            total_score: record.total_score,
            tier,
            industry_score: record.industry_score,
            geography_score: record.geography_score,
            financial_score: record.financial_score,
            profile_score: record.profile_score,
            timeline_score: record.timeline_score,
            transaction_score: record.transaction_score,
            breakdown: record.breakdown,
            status: record.status,
            reviewed_by: record.reviewed_by,
            deal_id: record.deal_id,
            notes: record.notes,
            engine_version: record.engine_version,
            computed_at: record.computed_at,
        }
    }
}
