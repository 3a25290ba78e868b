pub mod match_records;
pub mod migrations;
pub mod pool;
pub mod profiles;
pub mod util;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use match_records::{
    fetch_match_by_id, fetch_match_by_pair, list_matches, transition_match, upsert_match_scores,
    MatchGrouping, MatchListFilter, MatchRecordError, PgMatchStore,
};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool_from_url, DbPoolError, PgPool};
pub use profiles::{
    fetch_active_investors, fetch_active_targets, fetch_investor, fetch_target, PgProfileSource,
    ProfileFetchError,
};
