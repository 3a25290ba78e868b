use async_trait::async_trait;
use deadpool_postgres::PoolError;
use serde::Deserialize;
use thiserror::Error;
use tokio_postgres::types::Json;
use tokio_postgres::Row;
use tracing::instrument;

use crate::db::util::TimedClientExt;
use crate::db::PgPool;
use crate::rescan::{BoxError, ProfileSource};
use crate::{BudgetRange, Financials, InvestorProfile, TargetProfile};

#[derive(Debug, Error)]
pub enum ProfileFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

// JSONB shapes as the host application stores them. The engine only sees the
// parsed structs; raw delimited strings never reach scoring.
#[derive(Debug, Deserialize)]
struct BudgetJson {
    min: f64,
    max: f64,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinancialsJson {
    #[serde(default)]
    revenue: Option<f64>,
    #[serde(default)]
    ebitda: Option<f64>,
    #[serde(default)]
    ebitda_multiple: Option<f64>,
    #[serde(default)]
    asking_valuation: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

fn string_list(row: &Row, column: &str) -> Vec<String> {
    row.get::<_, Option<Json<Vec<String>>>>(column)
        .map(|json| json.0)
        .unwrap_or_default()
}

fn row_to_investor(row: &Row) -> InvestorProfile {
    let budget = row
        .get::<_, Option<Json<BudgetJson>>>("budget")
        .map(|json| json.0)
        .map(|b| BudgetRange {
            min: b.min,
            max: b.max,
            currency: b.currency.unwrap_or_else(|| "USD".into()),
        });

    InvestorProfile {
        id: row.get("id"),
        name: row.get("name"),
        industries: string_list(row, "industries"),
        target_countries: string_list(row, "target_countries"),
        budget,
        timeline: row.get("timeline"),
        ownership_min_pct: row.get("ownership_min_pct"),
        ownership_max_pct: row.get("ownership_max_pct"),
        company_type: row.get("company_type"),
        employee_min: row.get("employee_min"),
        employee_max: row.get("employee_max"),
        min_years_in_business: row.get("min_years_in_business"),
        active: true,
    }
}

fn row_to_target(row: &Row) -> TargetProfile {
    let financials = row
        .get::<_, Option<Json<FinancialsJson>>>("financials")
        .map(|json| json.0)
        .map(|f| Financials {
            revenue: f.revenue,
            ebitda: f.ebitda,
            ebitda_multiple: f.ebitda_multiple,
            asking_valuation: f.asking_valuation,
            currency: f.currency.unwrap_or_else(|| "USD".into()),
        });

    TargetProfile {
        id: row.get("id"),
        name: row.get("name"),
        industries: string_list(row, "industries"),
        hq_country: row.get("hq_country"),
        financials,
        timeline: row.get("timeline"),
        ownership_offered_pct: row.get("ownership_offered_pct"),
        company_type: row.get("company_type"),
        employee_count: row.get("employee_count"),
        year_founded: row.get("year_founded"),
        active: true,
    }
}

#[instrument(skip(pool))]
pub async fn fetch_active_investors(
    pool: &PgPool,
) -> Result<Vec<InvestorProfile>, ProfileFetchError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT id, name, industries, target_countries, budget, timeline, \
                    ownership_min_pct, ownership_max_pct, company_type, \
                    employee_min, employee_max, min_years_in_business \
             FROM matchiq.investors \
             WHERE active AND NOT is_draft \
             ORDER BY id",
            &[],
            "fetch_active_investors",
        )
        .await?;

    Ok(rows.iter().map(row_to_investor).collect())
}

#[instrument(skip(pool))]
pub async fn fetch_active_targets(pool: &PgPool) -> Result<Vec<TargetProfile>, ProfileFetchError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT id, name, industries, hq_country, financials, timeline, \
                    ownership_offered_pct, company_type, employee_count, year_founded \
             FROM matchiq.targets \
             WHERE active AND NOT is_draft \
             ORDER BY id",
            &[],
            "fetch_active_targets",
        )
        .await?;

    Ok(rows.iter().map(row_to_target).collect())
}

#[instrument(skip(pool))]
pub async fn fetch_investor(
    pool: &PgPool,
    investor_id: i64,
) -> Result<Option<InvestorProfile>, ProfileFetchError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "SELECT id, name, industries, target_countries, budget, timeline, \
                    ownership_min_pct, ownership_max_pct, company_type, \
                    employee_min, employee_max, min_years_in_business \
             FROM matchiq.investors WHERE id = $1",
            &[&investor_id],
            "fetch_investor",
        )
        .await?;

    Ok(row.as_ref().map(row_to_investor))
}

#[instrument(skip(pool))]
pub async fn fetch_target(
    pool: &PgPool,
    target_id: i64,
) -> Result<Option<TargetProfile>, ProfileFetchError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt_cached(
            "SELECT id, name, industries, hq_country, financials, timeline, \
                    ownership_offered_pct, company_type, employee_count, year_founded \
             FROM matchiq.targets WHERE id = $1",
            &[&target_id],
            "fetch_target",
        )
        .await?;

    Ok(row.as_ref().map(row_to_target))
}

/// `ProfileSource` adapter for the rescan orchestrator.
#[derive(Clone)]
pub struct PgProfileSource {
    pool: PgPool,
}

impl PgProfileSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileSource for PgProfileSource {
    async fn active_investors(&self) -> Result<Vec<InvestorProfile>, BoxError> {
        fetch_active_investors(&self.pool).await.map_err(Into::into)
    }

    async fn active_targets(&self) -> Result<Vec<TargetProfile>, BoxError> {
        fetch_active_targets(&self.pool).await.map_err(Into::into)
    }
}
