//! In-memory collaborator implementations, used by orchestrator tests and as
//! a scaffold for deployments that want to dry-run scoring without Postgres.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::lifecycle::MatchStatus;
use crate::rescan::{
    BoxError, MatchStore, ProfileSource, ScoreUpsert, StrongMatch, StrongMatchNotifier,
};
use crate::{InvestorProfile, MatchRecord, TargetProfile};

/// Fixed profile sets. `fail` simulates a full upstream outage.
#[derive(Debug, Default)]
pub struct StaticProfiles {
    pub investors: Vec<InvestorProfile>,
    pub targets: Vec<TargetProfile>,
    pub fail: bool,
}

#[async_trait]
impl ProfileSource for StaticProfiles {
    async fn active_investors(&self) -> Result<Vec<InvestorProfile>, BoxError> {
        if self.fail {
            return Err("profile source down".into());
        }
        Ok(self
            .investors
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    async fn active_targets(&self) -> Result<Vec<TargetProfile>, BoxError> {
        if self.fail {
            return Err("profile source down".into());
        }
        Ok(self.targets.iter().filter(|p| p.active).cloned().collect())
    }
}

/// Map-backed match store keyed by (investor_id, target_id). Upserts mirror
/// the Postgres semantics: score fields refreshed, review fields preserved.
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    records: Mutex<HashMap<(i64, i64), MatchRecord>>,
    next_id: Mutex<i64>,
    run_lock: AtomicBool,
}

impl InMemoryMatchStore {
    pub fn records(&self) -> Vec<MatchRecord> {
        let mut all: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|r| (r.investor_id, r.target_id));
        all
    }

    pub fn set_status(&self, investor_id: i64, target_id: i64, status: MatchStatus) {
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&(investor_id, target_id))
        {
            record.status = status;
        }
    }

    pub fn seed(&self, record: MatchRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.investor_id, record.target_id), record);
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn get_pair(
        &self,
        investor_id: i64,
        target_id: i64,
    ) -> Result<Option<MatchRecord>, BoxError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(investor_id, target_id))
            .cloned())
    }

    async fn upsert_scores(&self, upsert: &ScoreUpsert) -> Result<(), BoxError> {
        let mut records = self.records.lock().unwrap();
        let key = (upsert.investor_id, upsert.target_id);

        match records.get_mut(&key) {
            Some(record) => {
                record.total_score = upsert.total_score;
                record.industry_score = upsert.industry_score;
                record.geography_score = upsert.geography_score;
                record.financial_score = upsert.financial_score;
                record.profile_score = upsert.profile_score;
                record.timeline_score = upsert.timeline_score;
                record.transaction_score = upsert.transaction_score;
                record.breakdown = Some(upsert.breakdown.clone());
                record.engine_version = upsert.engine_version.clone();
                record.computed_at = upsert.computed_at;
            }
            None => {
                let mut next_id = self.next_id.lock().unwrap();
                *next_id += 1;
                records.insert(
                    key,
                    MatchRecord {
                        id: Some(*next_id),
                        investor_id: upsert.investor_id,
                        target_id: upsert.target_id,
                        total_score: upsert.total_score,
                        industry_score: upsert.industry_score,
                        geography_score: upsert.geography_score,
                        financial_score: upsert.financial_score,
                        profile_score: upsert.profile_score,
                        timeline_score: upsert.timeline_score,
                        transaction_score: upsert.transaction_score,
                        breakdown: Some(upsert.breakdown.clone()),
                        status: MatchStatus::Pending,
                        reviewed_by: None,
                        deal_id: None,
                        notes: None,
                        engine_version: upsert.engine_version.clone(),
                        computed_at: upsert.computed_at,
                    },
                );
            }
        }

        Ok(())
    }

    async fn try_lock_run(&self) -> Result<bool, BoxError> {
        Ok(self
            .run_lock
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok())
    }

    async fn unlock_run(&self) -> Result<(), BoxError> {
        self.run_lock.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Records notifications for assertions; can be told to fail every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    notified: Mutex<Vec<(i64, i64, i32)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn notified(&self) -> Vec<(i64, i64, i32)> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl StrongMatchNotifier for RecordingNotifier {
    async fn notify_strong_match(&self, strong: &StrongMatch) -> Result<(), BoxError> {
        self.notified
            .lock()
            .unwrap()
            .push((strong.investor_id, strong.target_id, strong.total_score));
        if self.fail {
            return Err("notification sink down".into());
        }
        Ok(())
    }
}
