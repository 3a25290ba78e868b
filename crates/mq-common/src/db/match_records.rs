use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Object, PoolError};
use serde_json::Value;
use tokio::sync::Mutex;
use thiserror::Error;
use tokio_postgres::types::{Json, ToSql};
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::lifecycle::{apply_transition, LifecycleError, MatchStatus, TransitionAction};
use crate::matching::Tier;
use crate::rescan::{BoxError, MatchStore, ScoreUpsert};
use crate::MatchRecord;

#[derive(Debug, Error)]
pub enum MatchRecordError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("match {0} not found")]
    NotFound(i64),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

fn row_to_record(row: &Row) -> Result<MatchRecord, MatchRecordError> {
    let status: String = row.get("status");
    let status = status
        .parse::<MatchStatus>()
        .map_err(MatchRecordError::Corrupt)?;
    let breakdown: Option<Json<Value>> = row.get("breakdown");

    Ok(MatchRecord {
        id: Some(row.get("id")),
        investor_id: row.get("investor_id"),
        target_id: row.get("target_id"),
        total_score: row.get("total_score"),
        industry_score: row.get("industry_score"),
        geography_score: row.get("geography_score"),
        financial_score: row.get("financial_score"),
        profile_score: row.get("profile_score"),
        timeline_score: row.get("timeline_score"),
        transaction_score: row.get("transaction_score"),
        breakdown: breakdown.map(|json| json.0),
        status,
        reviewed_by: row.get("reviewed_by"),
        deal_id: row.get("deal_id"),
        notes: row.get("notes"),
        engine_version: row.get("engine_version"),
        computed_at: row.get("computed_at"),
    })
}

const RECORD_COLUMNS: &str = "id, investor_id, target_id, total_score, \
    industry_score, geography_score, financial_score, profile_score, \
    timeline_score, transaction_score, breakdown, status, reviewed_by, \
    deal_id, notes, engine_version, computed_at";

/// Atomic score-path upsert. The conflict branch deliberately leaves status,
/// reviewed_by, deal_id and notes alone; only lifecycle actions write those.
#[instrument(skip(pool, upsert))]
pub async fn upsert_match_scores(
    pool: &PgPool,
    upsert: &ScoreUpsert,
) -> Result<u64, MatchRecordError> {
    let client = pool.get().await?;

    let rows = client
        .timed_execute_cached(
            "INSERT INTO matchiq.match_records (
                investor_id, target_id, total_score,
                industry_score, geography_score, financial_score,
                profile_score, timeline_score, transaction_score,
                breakdown, engine_version, computed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (investor_id, target_id) DO UPDATE SET
                total_score = EXCLUDED.total_score,
                industry_score = EXCLUDED.industry_score,
                geography_score = EXCLUDED.geography_score,
                financial_score = EXCLUDED.financial_score,
                profile_score = EXCLUDED.profile_score,
                timeline_score = EXCLUDED.timeline_score,
                transaction_score = EXCLUDED.transaction_score,
                breakdown = EXCLUDED.breakdown,
                engine_version = EXCLUDED.engine_version,
                computed_at = EXCLUDED.computed_at",
            &[
                &upsert.investor_id,
                &upsert.target_id,
                &upsert.total_score,
                &upsert.industry_score,
                &upsert.geography_score,
                &upsert.financial_score,
                &upsert.profile_score,
                &upsert.timeline_score,
                &upsert.transaction_score,
                &Json(&upsert.breakdown),
                &upsert.engine_version,
                &upsert.computed_at,
            ],
            "upsert_match_scores",
        )
        .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn fetch_match_by_id(
    pool: &PgPool,
    match_id: i64,
) -> Result<Option<MatchRecord>, MatchRecordError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            &format!("SELECT {RECORD_COLUMNS} FROM matchiq.match_records WHERE id = $1"),
            &[&match_id],
            "fetch_match_by_id",
        )
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

#[instrument(skip(pool))]
pub async fn fetch_match_by_pair(
    pool: &PgPool,
    investor_id: i64,
    target_id: i64,
) -> Result<Option<MatchRecord>, MatchRecordError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM matchiq.match_records \
                 WHERE investor_id = $1 AND target_id = $2"
            ),
            &[&investor_id, &target_id],
            "fetch_match_by_pair",
        )
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Explicit viewpoint for the clustered listing: which side the rows are
/// grouped under. Never inferred from which filter happens to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchGrouping {
    #[default]
    Investor,
    Target,
}

#[derive(Debug, Clone, Default)]
pub struct MatchListFilter {
    pub min_score: Option<i32>,
    pub tier: Option<Tier>,
    pub status: Option<MatchStatus>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub group_by: MatchGrouping,
    pub limit: i64,
    pub offset: i64,
}

#[instrument(skip(pool, filter))]
pub async fn list_matches(
    pool: &PgPool,
    filter: &MatchListFilter,
) -> Result<Vec<MatchRecord>, MatchRecordError> {
    let client = pool.get().await?;

    // min_score and tier both lower-bound the composite; take the tighter one.
    let effective_min = match (filter.min_score, filter.tier) {
        (Some(min), Some(tier)) => Some(min.max(tier.min_score())),
        (Some(min), None) => Some(min),
        (None, Some(tier)) => Some(tier.min_score()),
        (None, None) => None,
    };
    let status = filter.status.map(|s| s.as_str().to_string());

    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

    if let Some(min) = effective_min.as_ref() {
        params.push(min);
        conditions.push(format!("m.total_score >= ${}", params.len()));
    }
    if let Some(status) = status.as_ref() {
        params.push(status);
        conditions.push(format!("m.status = ${}", params.len()));
    }
    if let Some(industry) = filter.industry.as_ref() {
        params.push(industry);
        conditions.push(industry_condition(params.len()));
    }
    if let Some(country) = filter.country.as_ref() {
        params.push(country);
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM matchiq.targets t \
             WHERE t.id = m.target_id AND lower(t.hq_country) = lower(${}))",
            params.len()
        ));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let order = match filter.group_by {
        MatchGrouping::Investor => "m.investor_id, m.total_score DESC, m.target_id",
        MatchGrouping::Target => "m.target_id, m.total_score DESC, m.investor_id",
    };

    params.push(&filter.limit);
    let limit_pos = params.len();
    params.push(&filter.offset);
    let offset_pos = params.len();

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM matchiq.match_records m \
         {where_clause} ORDER BY {order} LIMIT ${limit_pos} OFFSET ${offset_pos}"
    );

    let rows = client
        .timed_query_cached(&sql, &params, "list_matches")
        .await?;

    rows.iter().map(row_to_record).collect()
}

// Industry lists are matched case-insensitively, the same normalization the
// industry scorer applies.
fn industry_condition(param: usize) -> String {
    format!(
        "EXISTS (SELECT 1 FROM matchiq.targets t \
         WHERE t.id = m.target_id AND EXISTS (\
             SELECT 1 FROM jsonb_array_elements_text(t.industries) AS ind(industry) \
             WHERE lower(industry) = lower(${param})))"
    )
}

/// Apply one lifecycle action under a row lock so concurrent actions and
/// rescans cannot interleave on the review fields.
#[instrument(skip(pool, actor, notes))]
pub async fn transition_match(
    pool: &PgPool,
    match_id: i64,
    action: TransitionAction,
    actor: &str,
    deal_id: Option<i64>,
    notes: Option<&str>,
) -> Result<MatchRecord, MatchRecordError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_opt(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM matchiq.match_records \
                 WHERE id = $1 FOR UPDATE"
            ),
            &[&match_id],
        )
        .await?
        .ok_or(MatchRecordError::NotFound(match_id))?;
    let current = row_to_record(&row)?;

    let next = apply_transition(current.status, action, deal_id)?;

    let reviewed_by = match action {
        TransitionAction::Review => Some(actor.to_string()),
        _ => current.reviewed_by.clone(),
    };
    let deal_id = match action {
        TransitionAction::Convert => deal_id,
        _ => current.deal_id,
    };
    let notes = notes.map(str::to_string).or(current.notes.clone());

    let updated = tx
        .query_one(
            &format!(
                "UPDATE matchiq.match_records \
                 SET status = $2, reviewed_by = $3, deal_id = $4, notes = $5 \
                 WHERE id = $1 RETURNING {RECORD_COLUMNS}"
            ),
            &[&match_id, &next.as_str(), &reviewed_by, &deal_id, &notes],
        )
        .await?;
    let record = row_to_record(&updated)?;

    tx.commit().await?;
    Ok(record)
}

/// Advisory lock key fencing rescans across every process on one database.
/// Spells "mqrescan" in ASCII.
const RESCAN_LOCK_KEY: i64 = 0x6d71_7265_7363_616e;

/// `MatchStore` adapter for the rescan orchestrator. The run lock is a
/// Postgres advisory lock, so the at-most-one-rescan rule holds across the
/// API and the worker binary, not just within one process.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
    lock_session: Arc<Mutex<Option<Object>>>,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_session: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn get_pair(
        &self,
        investor_id: i64,
        target_id: i64,
    ) -> Result<Option<MatchRecord>, BoxError> {
        fetch_match_by_pair(&self.pool, investor_id, target_id)
            .await
            .map_err(Into::into)
    }

    async fn upsert_scores(&self, upsert: &ScoreUpsert) -> Result<(), BoxError> {
        upsert_match_scores(&self.pool, upsert).await?;
        Ok(())
    }

    async fn try_lock_run(&self) -> Result<bool, BoxError> {
        let mut session = self.lock_session.lock().await;
        if session.is_some() {
            return Ok(false);
        }

        let client = self.pool.get().await?;
        let row = client
            .query_one("SELECT pg_try_advisory_lock($1)", &[&RESCAN_LOCK_KEY])
            .await?;
        if !row.get::<_, bool>(0) {
            return Ok(false);
        }

        // Advisory locks are session-scoped: keep this connection checked
        // out until the run releases it. If the process dies mid-run the
        // session closes and the lock falls away with it.
        *session = Some(client);
        Ok(true)
    }

    async fn unlock_run(&self) -> Result<(), BoxError> {
        let mut session = self.lock_session.lock().await;
        if let Some(client) = session.take() {
            client
                .execute("SELECT pg_advisory_unlock($1)", &[&RESCAN_LOCK_KEY])
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_and_min_score_filters_combine() {
        let filter = MatchListFilter {
            min_score: Some(50),
            tier: Some(Tier::Strong),
            ..MatchListFilter::default()
        };
        let effective = filter
            .min_score
            .unwrap()
            .max(filter.tier.unwrap().min_score());
        assert_eq!(effective, 80);
    }

    #[test]
    fn grouping_defaults_to_investor_view() {
        assert_eq!(MatchGrouping::default(), MatchGrouping::Investor);
    }

    #[test]
    fn industry_filter_matches_case_insensitively() {
        let condition = industry_condition(3);
        assert!(condition.contains("lower(industry) = lower($3)"));
        assert!(condition.contains("jsonb_array_elements_text"));
    }
}
