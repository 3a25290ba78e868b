use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::matching::weights::WeightsError;
use crate::matching::{MatchEngine, MatchScore, ScoringConfig, Tier};
use crate::{InvestorProfile, MatchRecord, TargetProfile, ENGINE_VERSION};

/// Total score at and above which a match counts as strong and triggers the
/// notification hook when first reached.
pub const STRONG_MATCH_THRESHOLD: i32 = 70;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read access to eligible (active, non-draft) profiles.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn active_investors(&self) -> Result<Vec<InvestorProfile>, BoxError>;
    async fn active_targets(&self) -> Result<Vec<TargetProfile>, BoxError>;
}

/// Persistence for match records, keyed by (investor_id, target_id). The
/// upsert must be atomic on the pair and must only touch the score fields;
/// status, reviewed_by, deal_id and notes belong to the lifecycle path.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_pair(
        &self,
        investor_id: i64,
        target_id: i64,
    ) -> Result<Option<MatchRecord>, BoxError>;

    async fn upsert_scores(&self, upsert: &ScoreUpsert) -> Result<(), BoxError>;

    /// Claim the deployment-wide rescan slot shared by every process writing
    /// to this store. Returns false when another holder has it. Stores with
    /// no shared state can keep the default no-op.
    async fn try_lock_run(&self) -> Result<bool, BoxError> {
        Ok(true)
    }

    /// Release the slot claimed by `try_lock_run`.
    async fn unlock_run(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StrongMatch {
    pub investor_id: i64,
    pub target_id: i64,
    pub investor_name: Option<String>,
    pub target_name: Option<String>,
    pub total_score: i32,
    pub tier: Tier,
}

/// Fire-and-forget notification sink. Failures are logged by the caller and
/// never fail the rescan.
#[async_trait]
pub trait StrongMatchNotifier: Send + Sync {
    async fn notify_strong_match(&self, strong: &StrongMatch) -> Result<(), BoxError>;
}

/// Default sink: a structured log line. Deployments wire a real sink here.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl StrongMatchNotifier for LoggingNotifier {
    async fn notify_strong_match(&self, strong: &StrongMatch) -> Result<(), BoxError> {
        info!(
            investor_id = strong.investor_id,
            target_id = strong.target_id,
            total_score = strong.total_score,
            tier = strong.tier.as_str(),
            "strong match found"
        );
        Ok(())
    }
}

/// Score-path fields written by a rescan. Everything the lifecycle owns is
/// deliberately absent.
#[derive(Debug, Clone)]
pub struct ScoreUpsert {
    pub investor_id: i64,
    pub target_id: i64,
    pub total_score: i32,
    pub industry_score: Option<f64>,
    pub geography_score: Option<f64>,
    pub financial_score: Option<f64>,
    pub profile_score: Option<f64>,
    pub timeline_score: Option<f64>,
    pub transaction_score: Option<f64>,
    pub breakdown: Value,
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
}

impl ScoreUpsert {
    pub fn from_score(
        investor_id: i64,
        target_id: i64,
        score: &MatchScore,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            investor_id,
            target_id,
            total_score: score.total_score,
            industry_score: score.breakdown.industry.rounded(),
            geography_score: score.breakdown.geography.rounded(),
            financial_score: score.breakdown.financial.rounded(),
            profile_score: score.breakdown.profile.rounded(),
            timeline_score: score.breakdown.timeline.rounded(),
            transaction_score: score.breakdown.transaction.rounded(),
            breakdown: score.breakdown.to_json(),
            engine_version: ENGINE_VERSION.to_string(),
            computed_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RescanOptions {
    /// Pairs processed per batch; progress persists batch by batch.
    pub batch_size: usize,
    /// Concurrent pair upserts within a batch.
    pub concurrency: usize,
    /// Re-score pairs already dismissed by a reviewer. Off by default.
    pub include_dismissed: bool,
}

impl Default for RescanOptions {
    fn default() -> Self {
        Self {
            batch_size: 200,
            concurrency: 8,
            include_dismissed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescanSummary {
    pub updated_count: u64,
    pub strong_match_count: u64,
    pub skipped_dismissed: u64,
    pub failed_pairs: u64,
    pub cancelled: bool,
}

#[derive(Debug, Error)]
pub enum RescanError {
    #[error("a rescan is already in flight")]
    AlreadyRunning,
    #[error(transparent)]
    InvalidWeights(#[from] WeightsError),
    #[error("profile source unavailable after {completed_pairs} pairs: {source}")]
    ProfileSource {
        completed_pairs: u64,
        source: BoxError,
    },
    #[error("failed to acquire the rescan lock: {0}")]
    Lock(BoxError),
}

/// Cooperative cancellation handle shared with whoever supervises the run.
/// A cancelled rescan stops at the next batch boundary; because each pair
/// upsert is atomic and independent, the partial state is valid.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct PairOutcome {
    updated: bool,
    newly_strong: bool,
    skipped_dismissed: bool,
    failed: bool,
}

/// Walks the cross product of eligible investors and targets, recomputes
/// every pair and upserts the result. At most one rescan runs at a time
/// per deployment: an atomic guard fences callers within this process and
/// the store's run lock fences other processes over the same database.
pub struct RescanOrchestrator {
    engine: Arc<MatchEngine>,
    profiles: Arc<dyn ProfileSource>,
    store: Arc<dyn MatchStore>,
    notifier: Arc<dyn StrongMatchNotifier>,
    in_flight: AtomicBool,
}

impl RescanOrchestrator {
    pub fn new(
        engine: Arc<MatchEngine>,
        profiles: Arc<dyn ProfileSource>,
        store: Arc<dyn MatchStore>,
        notifier: Arc<dyn StrongMatchNotifier>,
    ) -> Self {
        Self {
            engine,
            profiles,
            store,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub async fn rescan(
        &self,
        config: &ScoringConfig,
        options: &RescanOptions,
        cancel: &CancelFlag,
    ) -> Result<RescanSummary, RescanError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RescanError::AlreadyRunning);
        }
        let _guard = InFlightGuard(&self.in_flight);

        match self.store.try_lock_run().await {
            Ok(true) => {}
            Ok(false) => return Err(RescanError::AlreadyRunning),
            Err(source) => return Err(RescanError::Lock(source)),
        }

        let result = self.run_locked(config, options, cancel).await;
        if let Err(err) = self.store.unlock_run().await {
            warn!(error = %err, "failed to release the rescan lock");
        }
        result
    }

    async fn run_locked(
        &self,
        config: &ScoringConfig,
        options: &RescanOptions,
        cancel: &CancelFlag,
    ) -> Result<RescanSummary, RescanError> {
        config.weights.validate()?;

        let investors =
            self.profiles
                .active_investors()
                .await
                .map_err(|source| RescanError::ProfileSource {
                    completed_pairs: 0,
                    source,
                })?;
        let targets =
            self.profiles
                .active_targets()
                .await
                .map_err(|source| RescanError::ProfileSource {
                    completed_pairs: 0,
                    source,
                })?;

        info!(
            investors = investors.len(),
            targets = targets.len(),
            batch_size = options.batch_size,
            include_dismissed = options.include_dismissed,
            "rescan started"
        );

        let mut summary = RescanSummary::default();
        let batch_size = options.batch_size.max(1);
        let mut batch: Vec<(InvestorProfile, TargetProfile)> = Vec::with_capacity(batch_size);

        'outer: for investor in &investors {
            for target in &targets {
                batch.push((investor.clone(), target.clone()));
                if batch.len() == batch_size {
                    self.run_batch(config, options, &mut batch, &mut summary)
                        .await;
                    if cancel.is_cancelled() {
                        summary.cancelled = true;
                        break 'outer;
                    }
                }
            }
        }
        if !summary.cancelled && !batch.is_empty() {
            self.run_batch(config, options, &mut batch, &mut summary)
                .await;
        }

        info!(
            updated = summary.updated_count,
            strong = summary.strong_match_count,
            skipped_dismissed = summary.skipped_dismissed,
            failed = summary.failed_pairs,
            cancelled = summary.cancelled,
            "rescan finished"
        );

        Ok(summary)
    }

    async fn run_batch(
        &self,
        config: &ScoringConfig,
        options: &RescanOptions,
        batch: &mut Vec<(InvestorProfile, TargetProfile)>,
        summary: &mut RescanSummary,
    ) {
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (investor, target) in batch.drain(..) {
            let engine = Arc::clone(&self.engine);
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let semaphore = Arc::clone(&semaphore);
            let config = config.clone();
            let include_dismissed = options.include_dismissed;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                score_pair(
                    &engine,
                    store.as_ref(),
                    notifier.as_ref(),
                    &config,
                    &investor,
                    &target,
                    include_dismissed,
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(error = %err, "rescan pair task panicked");
                    PairOutcome {
                        failed: true,
                        ..PairOutcome::default()
                    }
                }
            };

            if outcome.updated {
                summary.updated_count += 1;
            }
            if outcome.newly_strong {
                summary.strong_match_count += 1;
            }
            if outcome.skipped_dismissed {
                summary.skipped_dismissed += 1;
            }
            if outcome.failed {
                summary.failed_pairs += 1;
            }
        }
    }
}

async fn score_pair(
    engine: &MatchEngine,
    store: &dyn MatchStore,
    notifier: &dyn StrongMatchNotifier,
    config: &ScoringConfig,
    investor: &InvestorProfile,
    target: &TargetProfile,
    include_dismissed: bool,
) -> PairOutcome {
    let mut outcome = PairOutcome::default();

    let existing = match store.get_pair(investor.id, target.id).await {
        Ok(existing) => existing,
        Err(err) => {
            warn!(
                investor_id = investor.id,
                target_id = target.id,
                error = %err,
                "failed to load existing match record"
            );
            outcome.failed = true;
            return outcome;
        }
    };

    if let Some(record) = existing.as_ref() {
        if record.status == crate::lifecycle::MatchStatus::Dismissed && !include_dismissed {
            outcome.skipped_dismissed = true;
            return outcome;
        }
    }

    let score = match engine.compute(config, investor, target) {
        Ok(score) => score,
        Err(err) => {
            // Weights are validated before the run; per-pair failure here
            // still must not abort the batch.
            warn!(
                investor_id = investor.id,
                target_id = target.id,
                error = %err,
                "scoring failed for pair"
            );
            outcome.failed = true;
            return outcome;
        }
    };

    let upsert = ScoreUpsert::from_score(investor.id, target.id, &score, Utc::now());
    if let Err(err) = store.upsert_scores(&upsert).await {
        warn!(
            investor_id = investor.id,
            target_id = target.id,
            error = %err,
            "failed to upsert match record"
        );
        outcome.failed = true;
        return outcome;
    }
    outcome.updated = true;

    let was_strong = existing
        .as_ref()
        .is_some_and(|record| record.total_score >= STRONG_MATCH_THRESHOLD);
    if score.total_score >= STRONG_MATCH_THRESHOLD && !was_strong {
        outcome.newly_strong = true;
        let strong = StrongMatch {
            investor_id: investor.id,
            target_id: target.id,
            investor_name: investor.name.clone(),
            target_name: target.name.clone(),
            total_score: score.total_score,
            tier: score.tier,
        };
        if let Err(err) = notifier.notify_strong_match(&strong).await {
            warn!(
                investor_id = investor.id,
                target_id = target.id,
                error = %err,
                "strong match notification failed"
            );
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::MatchStatus;
    use crate::store::{InMemoryMatchStore, RecordingNotifier, StaticProfiles};
    use crate::{BudgetRange, Financials};

    fn investor(id: i64) -> InvestorProfile {
        InvestorProfile {
            id,
            name: Some(format!("Investor {id}")),
            industries: vec!["Tech".into()],
            target_countries: vec!["Thailand".into()],
            budget: Some(BudgetRange {
                min: 1_000_000.0,
                max: 5_000_000.0,
                currency: "USD".into(),
            }),
            active: true,
            ..InvestorProfile::default()
        }
    }

    fn target(id: i64) -> TargetProfile {
        TargetProfile {
            id,
            name: Some(format!("Target {id}")),
            industries: vec!["Tech".into()],
            hq_country: Some("Thailand".into()),
            financials: Some(Financials {
                asking_valuation: Some(3_000_000.0),
                currency: "USD".into(),
                ..Financials::default()
            }),
            active: true,
            ..TargetProfile::default()
        }
    }

    fn orchestrator(
        profiles: StaticProfiles,
        store: Arc<InMemoryMatchStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> RescanOrchestrator {
        RescanOrchestrator::new(
            Arc::new(MatchEngine::default()),
            Arc::new(profiles),
            store,
            notifier,
        )
    }

    fn profiles(investors: usize, targets: usize) -> StaticProfiles {
        StaticProfiles {
            investors: (1..=investors as i64).map(investor).collect(),
            targets: (1..=targets as i64).map(target).collect(),
            ..StaticProfiles::default()
        }
    }

    #[tokio::test]
    async fn scores_every_eligible_pair_once() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(3, 4), Arc::clone(&store), Arc::clone(&notifier));

        let summary = orch
            .rescan(
                &ScoringConfig::default(),
                &RescanOptions::default(),
                &CancelFlag::default(),
            )
            .await
            .unwrap();

        assert_eq!(summary.updated_count, 12);
        assert_eq!(store.records().len(), 12);
        assert_eq!(summary.failed_pairs, 0);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn rescan_is_idempotent_and_keeps_one_record_per_pair() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(2, 2), Arc::clone(&store), Arc::clone(&notifier));

        let config = ScoringConfig::default();
        let options = RescanOptions::default();
        let first = orch
            .rescan(&config, &options, &CancelFlag::default())
            .await
            .unwrap();
        let scores_after_first: Vec<_> = store
            .records()
            .iter()
            .map(|r| (r.investor_id, r.target_id, r.total_score))
            .collect();

        let second = orch
            .rescan(&config, &options, &CancelFlag::default())
            .await
            .unwrap();
        let scores_after_second: Vec<_> = store
            .records()
            .iter()
            .map(|r| (r.investor_id, r.target_id, r.total_score))
            .collect();

        assert_eq!(first.updated_count, second.updated_count);
        assert_eq!(scores_after_first, scores_after_second);
        assert_eq!(store.records().len(), 4);
        // Strong pairs were already strong in run one: no re-notification.
        assert_eq!(second.strong_match_count, 0);
    }

    #[tokio::test]
    async fn notifies_newly_strong_pairs_once() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(1, 1), Arc::clone(&store), Arc::clone(&notifier));

        let summary = orch
            .rescan(
                &ScoringConfig::default(),
                &RescanOptions::default(),
                &CancelFlag::default(),
            )
            .await
            .unwrap();

        assert_eq!(summary.strong_match_count, 1);
        let notified = notifier.notified();
        assert_eq!(notified.len(), 1);
        assert!(notified[0].2 >= STRONG_MATCH_THRESHOLD);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_the_run() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::failing());
        let orch = orchestrator(profiles(1, 1), Arc::clone(&store), Arc::clone(&notifier));

        let summary = orch
            .rescan(
                &ScoringConfig::default(),
                &RescanOptions::default(),
                &CancelFlag::default(),
            )
            .await
            .unwrap();

        assert_eq!(summary.updated_count, 1);
        assert_eq!(summary.failed_pairs, 0);
        assert_eq!(summary.strong_match_count, 1);
    }

    #[tokio::test]
    async fn dismissed_pairs_are_skipped_unless_flagged() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(1, 2), Arc::clone(&store), Arc::clone(&notifier));

        let config = ScoringConfig::default();
        orch.rescan(&config, &RescanOptions::default(), &CancelFlag::default())
            .await
            .unwrap();
        store.set_status(1, 1, MatchStatus::Dismissed);

        let skip = orch
            .rescan(&config, &RescanOptions::default(), &CancelFlag::default())
            .await
            .unwrap();
        assert_eq!(skip.updated_count, 1);
        assert_eq!(skip.skipped_dismissed, 1);
        let dismissed = store.get_pair(1, 1).await.unwrap().unwrap();
        assert_eq!(dismissed.status, MatchStatus::Dismissed);

        let forced = orch
            .rescan(
                &config,
                &RescanOptions {
                    include_dismissed: true,
                    ..RescanOptions::default()
                },
                &CancelFlag::default(),
            )
            .await
            .unwrap();
        assert_eq!(forced.updated_count, 2);
        // Re-scoring a dismissed pair refreshes its score but not its status.
        let dismissed = store.get_pair(1, 1).await.unwrap().unwrap();
        assert_eq!(dismissed.status, MatchStatus::Dismissed);
    }

    #[tokio::test]
    async fn profile_outage_aborts_the_run() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(
            StaticProfiles {
                fail: true,
                ..StaticProfiles::default()
            },
            Arc::clone(&store),
            Arc::clone(&notifier),
        );

        let err = orch
            .rescan(
                &ScoringConfig::default(),
                &RescanOptions::default(),
                &CancelFlag::default(),
            )
            .await
            .unwrap_err();

        match err {
            RescanError::ProfileSource {
                completed_pairs, ..
            } => assert_eq!(completed_pairs, 0),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!orch.is_in_flight());
    }

    #[tokio::test]
    async fn invalid_weights_rejected_before_any_pair() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(1, 1), Arc::clone(&store), Arc::clone(&notifier));

        let mut config = ScoringConfig::default();
        config.weights.industry = -1.0;

        let err = orch
            .rescan(&config, &RescanOptions::default(), &CancelFlag::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RescanError::InvalidWeights(_)));
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_at_batch_boundary() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = orchestrator(profiles(4, 5), Arc::clone(&store), Arc::clone(&notifier));

        let cancel = CancelFlag::default();
        cancel.cancel();

        let summary = orch
            .rescan(
                &ScoringConfig::default(),
                &RescanOptions {
                    batch_size: 5,
                    ..RescanOptions::default()
                },
                &cancel,
            )
            .await
            .unwrap();

        assert!(summary.cancelled);
        // First batch persisted; the rest never ran.
        assert_eq!(summary.updated_count, 5);
        assert_eq!(store.records().len(), 5);
        assert!(!orch.is_in_flight());
    }

    #[tokio::test]
    async fn second_concurrent_rescan_is_rejected() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let orch = Arc::new(orchestrator(
            profiles(10, 10),
            Arc::clone(&store),
            Arc::clone(&notifier),
        ));

        let first = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move {
                orch.rescan(
                    &ScoringConfig::default(),
                    &RescanOptions {
                        batch_size: 1,
                        concurrency: 1,
                        ..RescanOptions::default()
                    },
                    &CancelFlag::default(),
                )
                .await
            })
        };

        // Poll until the first run has claimed the in-flight slot, then
        // the overlapping request must be rejected.
        let mut rejected = false;
        for _ in 0..200 {
            if orch.is_in_flight() {
                let result = orch
                    .rescan(
                        &ScoringConfig::default(),
                        &RescanOptions::default(),
                        &CancelFlag::default(),
                    )
                    .await;
                rejected = matches!(result, Err(RescanError::AlreadyRunning));
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let first = first.await.unwrap().unwrap();
        assert_eq!(first.updated_count, 100);
        if rejected {
            assert!(!orch.is_in_flight());
        }
    }

    #[tokio::test]
    async fn overlapping_orchestrators_share_one_run_slot() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        // Two independent entry points over the same store, as when the API
        // and the worker binary both trigger a rescan.
        let api_side = orchestrator(profiles(3, 3), Arc::clone(&store), Arc::clone(&notifier));
        let worker_side = orchestrator(profiles(3, 3), Arc::clone(&store), Arc::clone(&notifier));

        let slow = RescanOptions {
            batch_size: 1,
            concurrency: 1,
            ..RescanOptions::default()
        };
        let config = ScoringConfig::default();
        let default_options = RescanOptions::default();
        let api_cancel = CancelFlag::default();
        let worker_cancel = CancelFlag::default();
        let (first, second) = tokio::join!(
            api_side.rescan(&config, &slow, &api_cancel),
            worker_side.rescan(&config, &default_options, &worker_cancel),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(RescanError::AlreadyRunning))));
        // Each strong pair announced once, not once per entry point.
        assert_eq!(notifier.notified().len(), 9);
        assert_eq!(store.records().len(), 9);
    }

    #[tokio::test]
    async fn run_slot_is_released_after_a_failed_run() {
        let store = Arc::new(InMemoryMatchStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let broken = orchestrator(
            StaticProfiles {
                fail: true,
                ..StaticProfiles::default()
            },
            Arc::clone(&store),
            Arc::clone(&notifier),
        );
        let healthy = orchestrator(profiles(1, 1), Arc::clone(&store), Arc::clone(&notifier));

        let config = ScoringConfig::default();
        let options = RescanOptions::default();
        broken
            .rescan(&config, &options, &CancelFlag::default())
            .await
            .unwrap_err();

        let summary = healthy
            .rescan(&config, &options, &CancelFlag::default())
            .await
            .unwrap();
        assert_eq!(summary.updated_count, 1);
    }
}
