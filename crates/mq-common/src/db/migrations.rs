use deadpool_postgres::PoolError;
use thiserror::Error;
use tracing::info;

use crate::db::PgPool;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

// Profile rows are written by the host application, but the tables live in
// our schema and are created here so a fresh deployment can boot and run its
// first rescan before any data arrives.
const MIGRATIONS: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS matchiq",
    "CREATE TABLE IF NOT EXISTS matchiq.investors (
        id BIGSERIAL PRIMARY KEY,
        name TEXT,
        industries JSONB,
        target_countries JSONB,
        budget JSONB,
        timeline TEXT,
        ownership_min_pct DOUBLE PRECISION,
        ownership_max_pct DOUBLE PRECISION,
        company_type TEXT,
        employee_min INTEGER,
        employee_max INTEGER,
        min_years_in_business INTEGER,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        is_draft BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS matchiq.targets (
        id BIGSERIAL PRIMARY KEY,
        name TEXT,
        industries JSONB,
        hq_country TEXT,
        financials JSONB,
        timeline TEXT,
        ownership_offered_pct DOUBLE PRECISION,
        company_type TEXT,
        employee_count INTEGER,
        year_founded INTEGER,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        is_draft BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS matchiq.match_records (
        id BIGSERIAL PRIMARY KEY,
        investor_id BIGINT NOT NULL,
        target_id BIGINT NOT NULL,
        total_score INTEGER NOT NULL,
        industry_score DOUBLE PRECISION,
        geography_score DOUBLE PRECISION,
        financial_score DOUBLE PRECISION,
        profile_score DOUBLE PRECISION,
        timeline_score DOUBLE PRECISION,
        transaction_score DOUBLE PRECISION,
        breakdown JSONB,
        status TEXT NOT NULL DEFAULT 'pending',
        reviewed_by TEXT,
        deal_id BIGINT,
        notes TEXT,
        engine_version TEXT NOT NULL DEFAULT '',
        computed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (investor_id, target_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_match_records_total_score
        ON matchiq.match_records (total_score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_match_records_status
        ON matchiq.match_records (status)",
    "CREATE INDEX IF NOT EXISTS idx_match_records_target
        ON matchiq.match_records (target_id, total_score DESC)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_match_records_deal
        ON matchiq.match_records (deal_id) WHERE deal_id IS NOT NULL",
];

/// Apply the embedded schema. Every statement is idempotent, so this is safe
/// to run on every startup.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let client = pool.get().await?;
    for statement in MIGRATIONS {
        client.batch_execute(statement).await?;
    }
    info!(statements = MIGRATIONS.len(), "schema migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_cover_every_queried_table() {
        for table in ["matchiq.investors", "matchiq.targets", "matchiq.match_records"] {
            assert!(
                MIGRATIONS
                    .iter()
                    .any(|s| s.contains(&format!("CREATE TABLE IF NOT EXISTS {table}"))),
                "no migration creates {table}"
            );
        }
    }
}
