use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Value};

use super::regions::{default_region_table, normalize_country, RegionTable};
use super::timeline::{proximity_score, TimelineBucket};
use super::weights::{MatchWeights, WeightsError};
use super::Tier;
use crate::fx::{default_rate_table, ExchangeRates};
use crate::{InvestorProfile, TargetProfile};

/// All tunables for one scoring run. Passed explicitly into every call; the
/// engine itself holds no mutable configuration.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub weights: MatchWeights,
    /// Partial credit when countries differ but share a region.
    pub region_partial_score: f64,
    /// Fraction of the violated budget bound over which the financial score
    /// decays linearly to zero.
    pub financial_tolerance: f64,
    /// Score lost per timeline bucket of separation.
    pub timeline_step_decay: f64,
    /// Percentage points outside the preferred stake range over which the
    /// ownership score decays linearly to zero.
    pub ownership_tolerance_pct: f64,
    /// Reference date for derived ages (years in business).
    pub as_of: NaiveDate,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            region_partial_score: 0.6,
            financial_tolerance: 0.5,
            timeline_step_decay: 0.25,
            ownership_tolerance_pct: 20.0,
            as_of: Utc::now().date_naive(),
        }
    }
}

/// Outcome of one dimension scorer. `score: None` means the dimension could
/// not be computed from the available fields; it is excluded from the
/// weighted average rather than counted as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionResult {
    pub score: Option<f64>,
    pub status: &'static str,
    pub details: String,
}

impl DimensionResult {
    fn scored(score: f64, details: impl Into<String>) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            score: Some(score),
            status: status_from_score(score),
            details: details.into(),
        }
    }

    fn not_computable(details: impl Into<String>) -> Self {
        Self {
            score: None,
            status: "NOT_COMPUTABLE",
            details: details.into(),
        }
    }

    /// Score rounded to the 4-decimal precision persisted per dimension.
    pub fn rounded(&self) -> Option<f64> {
        self.score.map(round4)
    }

    fn to_json(&self) -> Value {
        json!({
            "score": self.rounded(),
            "status": self.status,
            "details": self.details,
        })
    }
}

fn status_from_score(score: f64) -> &'static str {
    if score >= 0.9 {
        "PERFECT_MATCH"
    } else if score >= 0.7 {
        "MATCH"
    } else if score >= 0.4 {
        "PARTIAL_MATCH"
    } else {
        "MISS"
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub industry: DimensionResult,
    pub geography: DimensionResult,
    pub financial: DimensionResult,
    pub profile: DimensionResult,
    pub timeline: DimensionResult,
    pub transaction: DimensionResult,
}

impl ScoreBreakdown {
    pub fn to_json(&self) -> Value {
        json!({
            "industry": self.industry.to_json(),
            "geography": self.geography.to_json(),
            "financial": self.financial.to_json(),
            "profile": self.profile.to_json(),
            "timeline": self.timeline.to_json(),
            "transaction": self.transaction.to_json(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub total_score: i32,
    pub tier: Tier,
    pub breakdown: ScoreBreakdown,
}

/// Computes the six dimension scores and their weighted composite for one
/// investor/target pair. Pure and deterministic: no state survives a call.
pub struct MatchEngine {
    regions: RegionTable,
    fx: Arc<dyn ExchangeRates>,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            regions: default_region_table(),
            fx: Arc::new(default_rate_table()),
        }
    }
}

impl MatchEngine {
    pub fn new(regions: RegionTable, fx: Arc<dyn ExchangeRates>) -> Self {
        Self { regions, fx }
    }

    pub fn compute(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> Result<MatchScore, WeightsError> {
        config.weights.validate()?;

        let breakdown = ScoreBreakdown {
            industry: self.score_industry(investor, target),
            geography: self.score_geography(config, investor, target),
            financial: self.score_financial(config, investor, target),
            profile: self.score_profile(config, investor, target),
            timeline: self.score_timeline(config, investor, target),
            transaction: self.score_transaction(config, investor, target),
        };

        let weights = config.weights;
        let weighted = [
            (&breakdown.industry, weights.industry),
            (&breakdown.geography, weights.geography),
            (&breakdown.financial, weights.financial),
            (&breakdown.profile, weights.profile),
            (&breakdown.timeline, weights.timeline),
            (&breakdown.transaction, weights.transaction),
        ];

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (result, weight) in weighted {
            if let Some(score) = result.score {
                weighted_sum += weight * score;
                weight_total += weight;
            }
        }

        let total_score = if weight_total > 0.0 {
            (100.0 * weighted_sum / weight_total).round() as i32
        } else {
            0
        };
        let total_score = total_score.clamp(0, 100);

        Ok(MatchScore {
            total_score,
            tier: Tier::from_score(total_score),
            breakdown,
        })
    }

    fn score_industry(&self, investor: &InvestorProfile, target: &TargetProfile) -> DimensionResult {
        let wanted = normalize_set(&investor.industries);
        let offered = normalize_set(&target.industries);

        if wanted.is_empty() || offered.is_empty() {
            return DimensionResult::not_computable("industry lists missing on one side");
        }

        if wanted.len() == 1 && offered.len() == 1 && wanted == offered {
            let industry = wanted.iter().next().cloned().unwrap_or_default();
            return DimensionResult::scored(1.0, format!("exact industry match: {industry}"));
        }

        let intersection = wanted.intersection(&offered).count();
        let union = wanted.union(&offered).count();
        let score = intersection as f64 / union as f64;

        DimensionResult::scored(
            score,
            format!("industry overlap {intersection}/{union} (jaccard)"),
        )
    }

    fn score_geography(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> DimensionResult {
        let countries: Vec<String> = investor
            .target_countries
            .iter()
            .filter_map(|c| normalize_country(c))
            .collect();
        let hq = target.hq_country.as_deref().and_then(normalize_country);

        let (countries, hq) = match (countries.is_empty(), hq) {
            (true, _) => {
                return DimensionResult::not_computable("investor has no target countries")
            }
            (false, None) => return DimensionResult::not_computable("target HQ country unknown"),
            (false, Some(hq)) => (countries, hq),
        };

        if countries.contains(&hq) {
            return DimensionResult::scored(1.0, format!("exact country match: {hq}"));
        }

        let shared = countries
            .iter()
            .find_map(|country| self.regions.shared_region(country, &hq));
        match shared {
            Some(region) => DimensionResult::scored(
                config.region_partial_score,
                format!("same region ({region}): {hq}"),
            ),
            None => DimensionResult::scored(0.0, format!("no geography overlap with {hq}")),
        }
    }

    fn score_financial(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> DimensionResult {
        let Some(budget) = investor.budget.as_ref() else {
            return DimensionResult::not_computable("investor budget missing");
        };
        let Some(financials) = target.financials.as_ref() else {
            return DimensionResult::not_computable("target financials missing");
        };
        let Some(ask) = financials.ask() else {
            return DimensionResult::not_computable("target ask not derivable");
        };

        let converted = (
            self.fx.to_usd(budget.min, &budget.currency),
            self.fx.to_usd(budget.max, &budget.currency),
            self.fx.to_usd(ask, &financials.currency),
        );
        let (min_usd, max_usd, ask_usd) = match converted {
            (Ok(min), Ok(max), Ok(ask)) => (min, max, ask),
            _ => return DimensionResult::not_computable("exchange rate lookup failed"),
        };

        if min_usd > max_usd || max_usd <= 0.0 || ask_usd <= 0.0 {
            return DimensionResult::not_computable("budget window or ask not usable");
        }

        if ask_usd >= min_usd && ask_usd <= max_usd {
            return DimensionResult::scored(
                1.0,
                format!("ask ${ask_usd:.0} inside budget ${min_usd:.0}-${max_usd:.0}"),
            );
        }

        // Linear decay across a tolerance band sized from the violated bound.
        let (bound, overshoot) = if ask_usd < min_usd {
            (min_usd, min_usd - ask_usd)
        } else {
            (max_usd, ask_usd - max_usd)
        };
        let band = bound * config.financial_tolerance;
        let score = if band > 0.0 {
            (1.0 - overshoot / band).max(0.0)
        } else {
            0.0
        };

        DimensionResult::scored(
            score,
            format!("ask ${ask_usd:.0} outside budget ${min_usd:.0}-${max_usd:.0} by ${overshoot:.0}"),
        )
    }

    fn score_profile(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> DimensionResult {
        let mut checks: Vec<(f64, String)> = Vec::new();

        if let (Some(wanted), Some(actual)) =
            (investor.company_type.as_deref(), target.company_type.as_deref())
        {
            let hit = wanted.trim().eq_ignore_ascii_case(actual.trim());
            checks.push((
                if hit { 1.0 } else { 0.0 },
                format!("company type {}", if hit { "match" } else { "mismatch" }),
            ));
        }

        if let Some(count) = target.employee_count {
            if investor.employee_min.is_some() || investor.employee_max.is_some() {
                let min = investor.employee_min.unwrap_or(0);
                let max = investor.employee_max.unwrap_or(i32::MAX);
                let hit = count >= min && count <= max;
                checks.push((
                    if hit { 1.0 } else { 0.0 },
                    format!("{count} employees {} preferred range", if hit { "inside" } else { "outside" }),
                ));
            }
        }

        if let (Some(required), Some(founded)) =
            (investor.min_years_in_business, target.year_founded)
        {
            let years = (config.as_of.year() - founded).max(0);
            let score = if years >= required {
                1.0
            } else if years + 2 >= required {
                0.5
            } else {
                0.0
            };
            checks.push((score, format!("{years}y in business vs {required}y preferred")));
        }

        if checks.is_empty() {
            return DimensionResult::not_computable("no comparable profile attributes");
        }

        let score = checks.iter().map(|(s, _)| s).sum::<f64>() / checks.len() as f64;
        let details = checks
            .into_iter()
            .map(|(_, d)| d)
            .collect::<Vec<_>>()
            .join(" / ");

        DimensionResult::scored(score, details)
    }

    fn score_timeline(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> DimensionResult {
        let wanted = investor.timeline.as_deref().and_then(TimelineBucket::parse);
        let offered = target.timeline.as_deref().and_then(TimelineBucket::parse);

        let (Some(wanted), Some(offered)) = (wanted, offered) else {
            return DimensionResult::not_computable("timeline unknown on one side");
        };

        let score = proximity_score(wanted, offered, config.timeline_step_decay);
        DimensionResult::scored(
            score,
            format!("timeline {} buckets apart", wanted.distance(offered)),
        )
    }

    fn score_transaction(
        &self,
        config: &ScoringConfig,
        investor: &InvestorProfile,
        target: &TargetProfile,
    ) -> DimensionResult {
        let Some(offered) = target.ownership_offered_pct else {
            return DimensionResult::not_computable("target ownership offer unknown");
        };
        if investor.ownership_min_pct.is_none() && investor.ownership_max_pct.is_none() {
            return DimensionResult::not_computable("investor stake preference unknown");
        }

        let min = investor.ownership_min_pct.unwrap_or(0.0);
        let max = investor.ownership_max_pct.unwrap_or(100.0);
        if min > max {
            return DimensionResult::not_computable("investor stake preference inverted");
        }

        if offered >= min && offered <= max {
            return DimensionResult::scored(
                1.0,
                format!("{offered:.0}% offered inside preferred {min:.0}-{max:.0}%"),
            );
        }

        let gap = if offered < min { min - offered } else { offered - max };
        let score = if config.ownership_tolerance_pct > 0.0 {
            (1.0 - gap / config.ownership_tolerance_pct).max(0.0)
        } else {
            0.0
        };

        DimensionResult::scored(
            score,
            format!("{offered:.0}% offered is {gap:.0}pp outside preferred {min:.0}-{max:.0}%"),
        )
    }
}

fn normalize_set(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BudgetRange;
    use crate::Financials;

    fn investor() -> InvestorProfile {
        InvestorProfile {
            id: 1,
            industries: vec!["Tech".into(), "Retail".into()],
            target_countries: vec!["Thailand".into(), "Singapore".into()],
            budget: Some(BudgetRange {
                min: 1_000_000.0,
                max: 5_000_000.0,
                currency: "USD".into(),
            }),
            timeline: Some("3-6 months".into()),
            ownership_min_pct: Some(51.0),
            ownership_max_pct: Some(100.0),
            company_type: Some("Private Limited".into()),
            employee_min: Some(10),
            employee_max: Some(200),
            min_years_in_business: Some(5),
            active: true,
            ..InvestorProfile::default()
        }
    }

    fn target() -> TargetProfile {
        TargetProfile {
            id: 2,
            industries: vec!["Tech".into()],
            hq_country: Some("Thailand".into()),
            financials: Some(Financials {
                asking_valuation: Some(3_000_000.0),
                currency: "USD".into(),
                ..Financials::default()
            }),
            timeline: Some("3-6 months".into()),
            ownership_offered_pct: Some(70.0),
            company_type: Some("private limited".into()),
            employee_count: Some(45),
            year_founded: Some(2010),
            active: true,
            ..TargetProfile::default()
        }
    }

    fn only(dimension: &'static str) -> ScoringConfig {
        let mut weights = MatchWeights {
            industry: 0.0,
            geography: 0.0,
            financial: 0.0,
            profile: 0.0,
            timeline: 0.0,
            transaction: 0.0,
        };
        match dimension {
            "industry" => weights.industry = 1.0,
            "geography" => weights.geography = 1.0,
            "financial" => weights.financial = 1.0,
            "profile" => weights.profile = 1.0,
            "timeline" => weights.timeline = 1.0,
            "transaction" => weights.transaction = 1.0,
            _ => unreachable!(),
        }
        ScoringConfig {
            weights,
            ..ScoringConfig::default()
        }
    }

    #[test]
    fn jaccard_industry_overlap_scores_half() {
        let engine = MatchEngine::default();
        let score = engine
            .compute(&only("industry"), &investor(), &target())
            .unwrap();

        assert_eq!(score.breakdown.industry.score, Some(0.5));
        assert_eq!(score.total_score, 50);
        assert_eq!(score.tier, Tier::Low);
    }

    #[test]
    fn ask_inside_budget_scores_full() {
        let engine = MatchEngine::default();
        let score = engine
            .compute(&only("financial"), &investor(), &target())
            .unwrap();

        assert_eq!(score.breakdown.financial.score, Some(1.0));
        assert_eq!(score.total_score, 100);
        assert_eq!(score.tier, Tier::Excellent);
    }

    #[test]
    fn ask_outside_budget_decays_linearly() {
        let engine = MatchEngine::default();
        let mut target = target();
        // 25% over the 5M cap with a 50% tolerance band: expect 0.5.
        target.financials.as_mut().unwrap().asking_valuation = Some(6_250_000.0);

        let score = engine
            .compute(&only("financial"), &investor(), &target)
            .unwrap();
        let financial = score.breakdown.financial.score.unwrap();
        assert!((financial - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fx_conversion_applies_before_window_check() {
        let engine = MatchEngine::default();
        let mut target = target();
        // 106.5M THB at 35.5 THB/USD is 3M USD, inside the window.
        target.financials = Some(Financials {
            asking_valuation: Some(106_500_000.0),
            currency: "THB".into(),
            ..Financials::default()
        });

        let score = engine
            .compute(&only("financial"), &investor(), &target)
            .unwrap();
        assert_eq!(score.breakdown.financial.score, Some(1.0));
    }

    #[test]
    fn exact_country_match_beats_region_match() {
        let engine = MatchEngine::default();
        let exact = engine
            .compute(&only("geography"), &investor(), &target())
            .unwrap();
        assert_eq!(exact.breakdown.geography.score, Some(1.0));

        let mut regional = target();
        regional.hq_country = Some("Vietnam".into());
        let regional = engine
            .compute(&only("geography"), &investor(), &regional)
            .unwrap();
        assert_eq!(regional.breakdown.geography.score, Some(0.6));
        assert!(regional.breakdown.geography.details.contains("ASEAN"));

        let mut miss = target();
        miss.hq_country = Some("Germany".into());
        let miss = engine
            .compute(&only("geography"), &investor(), &miss)
            .unwrap();
        assert_eq!(miss.breakdown.geography.score, Some(0.0));
    }

    #[test]
    fn missing_dimension_is_excluded_not_zeroed() {
        let engine = MatchEngine::default();
        let mut target = target();
        target.timeline = None;

        // Timeline not computable: its weight must not drag the total down.
        let balanced = ScoringConfig::default();
        let mut heavy_timeline = ScoringConfig::default();
        heavy_timeline.weights.timeline = 10.0;

        let a = engine.compute(&balanced, &investor(), &target).unwrap();
        let b = engine.compute(&heavy_timeline, &investor(), &target).unwrap();

        assert_eq!(a.breakdown.timeline.score, None);
        assert_eq!(a.breakdown.timeline.status, "NOT_COMPUTABLE");
        assert_eq!(a.total_score, b.total_score);
    }

    #[test]
    fn no_computable_dimension_scores_zero() {
        let engine = MatchEngine::default();
        let investor = InvestorProfile {
            id: 1,
            active: true,
            ..InvestorProfile::default()
        };
        let target = TargetProfile {
            id: 2,
            active: true,
            ..TargetProfile::default()
        };

        let score = engine
            .compute(&ScoringConfig::default(), &investor, &target)
            .unwrap();
        assert_eq!(score.total_score, 0);
        assert_eq!(score.tier, Tier::Low);
    }

    #[test]
    fn compute_is_deterministic() {
        let engine = MatchEngine::default();
        let config = ScoringConfig::default();
        let a = engine.compute(&config, &investor(), &target()).unwrap();
        let b = engine.compute(&config, &investor(), &target()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn total_score_stays_in_bounds() {
        let engine = MatchEngine::default();
        let config = ScoringConfig {
            weights: MatchWeights {
                industry: 7.0,
                geography: 0.1,
                financial: 3.0,
                profile: 0.0,
                timeline: 0.5,
                transaction: 2.0,
            },
            ..ScoringConfig::default()
        };

        let score = engine.compute(&config, &investor(), &target()).unwrap();
        assert!((0..=100).contains(&score.total_score));
    }

    #[test]
    fn rejects_invalid_weights() {
        let engine = MatchEngine::default();
        let mut config = ScoringConfig::default();
        config.weights = MatchWeights {
            industry: 0.0,
            geography: 0.0,
            financial: 0.0,
            profile: 0.0,
            timeline: 0.0,
            transaction: 0.0,
        };

        let err = engine.compute(&config, &investor(), &target()).unwrap_err();
        assert_eq!(err, WeightsError::AllZero);
    }

    #[test]
    fn ownership_outside_range_decays() {
        let engine = MatchEngine::default();
        let mut target = target();
        target.ownership_offered_pct = Some(41.0);

        // 10pp below the 51% floor with a 20pp tolerance: expect 0.5.
        let score = engine
            .compute(&only("transaction"), &investor(), &target)
            .unwrap();
        let transaction = score.breakdown.transaction.score.unwrap();
        assert!((transaction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn timeline_mismatch_scores_by_distance() {
        let engine = MatchEngine::default();
        let mut target = target();
        target.timeline = Some("6-12 months".into());

        let score = engine
            .compute(&only("timeline"), &investor(), &target)
            .unwrap();
        assert_eq!(score.breakdown.timeline.score, Some(0.75));
        assert_eq!(score.total_score, 75);
    }

    #[test]
    fn profile_averages_available_checks() {
        let engine = MatchEngine::default();
        let mut target = target();
        target.employee_count = Some(500); // outside 10-200

        let score = engine
            .compute(&only("profile"), &investor(), &target)
            .unwrap();
        // company type hit (1.0), employees miss (0.0), years hit (1.0).
        let profile = score.breakdown.profile.score.unwrap();
        assert!((profile - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn years_in_business_follows_the_configured_as_of_date() {
        let engine = MatchEngine::default();
        let mut target = target();
        target.year_founded = Some(2022);
        target.company_type = None;
        target.employee_count = None;

        let config_at = |year: i32| ScoringConfig {
            as_of: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            ..only("profile")
        };
        let profile_at = |year: i32| {
            engine
                .compute(&config_at(year), &investor(), &target)
                .unwrap()
                .breakdown
                .profile
                .score
        };

        // 5 years required: met by 2027, two years short in 2025, far off in 2023.
        assert_eq!(profile_at(2027), Some(1.0));
        assert_eq!(profile_at(2025), Some(0.5));
        assert_eq!(profile_at(2023), Some(0.0));
    }

    #[test]
    fn breakdown_serializes_rounded_scores() {
        let engine = MatchEngine::default();
        let score = engine
            .compute(&ScoringConfig::default(), &investor(), &target())
            .unwrap();

        let json = score.breakdown.to_json();
        assert_eq!(json["industry"]["score"], 0.5);
        assert_eq!(json["timeline"]["status"], "PERFECT_MATCH");
    }

    #[test]
    fn round4_truncates_precision() {
        assert_eq!(round4(0.123_456_78), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
