pub mod api;
pub mod db;
pub mod fx;
pub mod lifecycle;
pub mod logging;
pub mod matching;
pub mod rescan;
pub mod store;

use chrono::{DateTime, Utc};
use serde_json::Value;

use lifecycle::MatchStatus;

/// Investor budget window in the investor's own currency.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// Target-side financial figures in the target's own currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Financials {
    pub revenue: Option<f64>,
    pub ebitda: Option<f64>,
    pub ebitda_multiple: Option<f64>,
    pub asking_valuation: Option<f64>,
    pub currency: String,
}

impl Financials {
    /// The figure the financial scorer compares against the budget window.
    /// Falls back to EBITDA x multiple when no explicit ask is recorded.
    pub fn ask(&self) -> Option<f64> {
        self.asking_valuation.or_else(|| {
            match (self.ebitda, self.ebitda_multiple) {
                (Some(ebitda), Some(multiple)) if ebitda > 0.0 => Some(ebitda * multiple),
                _ => None,
            }
        })
    }
}

// Read-only inputs to scoring. Collaborators are responsible for parsing
// stored JSON into these structures before they reach the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvestorProfile {
    pub id: i64,
    pub name: Option<String>,
    pub industries: Vec<String>,
    pub target_countries: Vec<String>,
    pub budget: Option<BudgetRange>,
    pub timeline: Option<String>,
    pub ownership_min_pct: Option<f64>,
    pub ownership_max_pct: Option<f64>,
    pub company_type: Option<String>,
    pub employee_min: Option<i32>,
    pub employee_max: Option<i32>,
    pub min_years_in_business: Option<i32>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetProfile {
    pub id: i64,
    pub name: Option<String>,
    pub industries: Vec<String>,
    pub hq_country: Option<String>,
    pub financials: Option<Financials>,
    pub timeline: Option<String>,
    pub ownership_offered_pct: Option<f64>,
    pub company_type: Option<String>,
    pub employee_count: Option<i32>,
    pub year_founded: Option<i32>,
    pub active: bool,
}

/// One scored investor/target pairing. Exactly one record exists per pair;
/// rescans refresh the score fields in place and never touch the review
/// fields (status, reviewed_by, deal_id, notes).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub id: Option<i64>,
    pub investor_id: i64,
    pub target_id: i64,
    pub total_score: i32,
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

impl MatchRecord {
    pub fn tier(&self) -> matching::Tier {
        matching::Tier::from_score(self.total_score)
    }
}

/// Stamped onto every persisted record so scoring changes are auditable.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
