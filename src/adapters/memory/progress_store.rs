//! In-memory progress store.
//!
//! Backs tests and single-process development. Mirrors the relational
//! adapter's semantics exactly: one progress row per user, compare-and-swap
//! on the stage column, idempotent practice-log upserts, write-once
//! baselines.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::assessment::{BaselineRecord, WeeklyDelta};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::progression::{PracticeLogEntry, PracticeType, ProgressState, Stage};
use crate::ports::{ProgressStore, UpdateOutcome};

#[derive(Default)]
struct Inner {
    progress: HashMap<UserId, ProgressState>,
    logs: HashMap<(UserId, PracticeType, NaiveDate), PracticeLogEntry>,
    baselines: HashMap<UserId, BaselineRecord>,
    deltas: HashMap<(UserId, NaiveDate), WeeklyDelta>,
}

/// Thread-safe in-memory implementation of [`ProgressStore`].
#[derive(Default)]
pub struct InMemoryProgressStore {
    inner: RwLock<Inner>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn get_progress(&self, user_id: &UserId) -> Result<Option<ProgressState>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner.progress.get(user_id).cloned())
    }

    async fn create_progress(&self, state: &ProgressState) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        if inner.progress.contains_key(&state.user_id) {
            return Err(DomainError::validation(
                "user_id",
                "User already has a progress record",
            ));
        }
        inner.progress.insert(state.user_id.clone(), state.clone());
        Ok(())
    }

    async fn update_progress_if_stage(
        &self,
        state: &ProgressState,
        expected_stage: Stage,
    ) -> Result<UpdateOutcome, DomainError> {
        let mut inner = self.inner.write().await;
        match inner.progress.get_mut(&state.user_id) {
            Some(stored) if stored.current_stage == expected_stage => {
                *stored = state.clone();
                Ok(UpdateOutcome::Applied)
            }
            Some(_) => Ok(UpdateOutcome::StaleStage),
            None => Err(DomainError::new(
                ErrorCode::ProgressNotFound,
                format!("No progress record for user {}", state.user_id),
            )),
        }
    }

    async fn upsert_practice_log(&self, entry: &PracticeLogEntry) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        let key = (entry.user_id.clone(), entry.practice, entry.date);
        inner.logs.insert(key, entry.clone());
        Ok(())
    }

    async fn practice_logs_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<PracticeLogEntry>, DomainError> {
        let inner = self.inner.read().await;
        let mut entries: Vec<PracticeLogEntry> = inner
            .logs
            .values()
            .filter(|e| &e.user_id == user_id && e.date >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.date);
        Ok(entries)
    }

    async fn get_baseline(&self, user_id: &UserId) -> Result<Option<BaselineRecord>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner.baselines.get(user_id).cloned())
    }

    async fn save_baseline(&self, baseline: &BaselineRecord) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        if inner.baselines.contains_key(&baseline.user_id) {
            return Err(DomainError::new(
                ErrorCode::BaselineAlreadyExists,
                format!("Baseline already recorded for user {}", baseline.user_id),
            ));
        }
        inner
            .baselines
            .insert(baseline.user_id.clone(), baseline.clone());
        Ok(())
    }

    async fn save_weekly_delta(&self, delta: &WeeklyDelta) -> Result<(), DomainError> {
        let mut inner = self.inner.write().await;
        let key = (delta.user_id.clone(), delta.week_start);
        inner.deltas.insert(key, delta.clone());
        Ok(())
    }

    async fn latest_weekly_delta(
        &self,
        user_id: &UserId,
    ) -> Result<Option<WeeklyDelta>, DomainError> {
        let inner = self.inner.read().await;
        Ok(inner
            .deltas
            .iter()
            .filter(|((uid, _), _)| uid == user_id)
            .max_by_key(|((_, week), _)| *week)
            .map(|(_, delta)| delta.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::DomainScoreSet;
    use crate::domain::foundation::Timestamp;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_780_000_000)
    }

    fn stage(n: u8) -> Stage {
        Stage::try_new(n).unwrap()
    }

    fn scores() -> DomainScoreSet {
        DomainScoreSet::try_new(2.0, 2.5, 3.0, 3.5).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryProgressStore::new();
        let state = ProgressState::new(user(), now());

        store.create_progress(&state).await.unwrap();
        let loaded = store.get_progress(&user()).await.unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryProgressStore::new();
        let state = ProgressState::new(user(), now());

        store.create_progress(&state).await.unwrap();
        assert!(store.create_progress(&state).await.is_err());
    }

    #[tokio::test]
    async fn conditional_update_applies_when_stage_matches() {
        let store = InMemoryProgressStore::new();
        let mut state = ProgressState::new(user(), now());
        store.create_progress(&state).await.unwrap();

        state.advance_to(stage(2), now()).unwrap();
        let outcome = store
            .update_progress_if_stage(&state, Stage::FIRST)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        let loaded = store.get_progress(&user()).await.unwrap().unwrap();
        assert_eq!(loaded.current_stage, stage(2));
    }

    #[tokio::test]
    async fn conditional_update_reports_stale_stage_without_writing() {
        let store = InMemoryProgressStore::new();
        let state = ProgressState::new(user(), now());
        store.create_progress(&state).await.unwrap();

        // First writer wins.
        let mut winner = state.clone();
        winner.advance_to(stage(2), now()).unwrap();
        store
            .update_progress_if_stage(&winner, Stage::FIRST)
            .await
            .unwrap();

        // Second writer read stage 1 but the row moved on.
        let mut loser = state.clone();
        loser.advance_to(stage(2), now()).unwrap();
        let outcome = store
            .update_progress_if_stage(&loser, Stage::FIRST)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::StaleStage);
    }

    #[tokio::test]
    async fn conditional_update_on_missing_row_is_not_found() {
        let store = InMemoryProgressStore::new();
        let state = ProgressState::new(user(), now());
        let err = store
            .update_progress_if_stage(&state, Stage::FIRST)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProgressNotFound);
    }

    #[tokio::test]
    async fn practice_log_upsert_is_idempotent() {
        let store = InMemoryProgressStore::new();
        let date = now().as_date();

        let entry = PracticeLogEntry::new(user(), PracticeType::SitPractice, date, true);
        store.upsert_practice_log(&entry).await.unwrap();
        store.upsert_practice_log(&entry).await.unwrap();

        let logs = store.practice_logs_since(&user(), date).await.unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn logs_before_the_cutoff_are_excluded() {
        let store = InMemoryProgressStore::new();
        let date = now().as_date();
        let old = now().minus_days(30).as_date();

        for d in [date, old] {
            let entry = PracticeLogEntry::new(user(), PracticeType::Breathwork, d, true);
            store.upsert_practice_log(&entry).await.unwrap();
        }

        let logs = store
            .practice_logs_since(&user(), now().minus_days(14).as_date())
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].date, date);
    }

    #[tokio::test]
    async fn baseline_is_write_once() {
        let store = InMemoryProgressStore::new();
        let baseline = BaselineRecord {
            user_id: user(),
            scores: scores(),
            captured_at: now(),
        };

        store.save_baseline(&baseline).await.unwrap();
        let err = store.save_baseline(&baseline).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BaselineAlreadyExists);
    }

    #[tokio::test]
    async fn latest_weekly_delta_picks_the_most_recent_week() {
        let store = InMemoryProgressStore::new();

        for weeks_ago in [3i64, 1, 2] {
            let delta = WeeklyDelta::for_week_of(
                user(),
                now().minus_days(weeks_ago * 7).as_date(),
                scores(),
            );
            store.save_weekly_delta(&delta).await.unwrap();
        }

        let latest = store.latest_weekly_delta(&user()).await.unwrap().unwrap();
        assert_eq!(
            latest.week_start,
            WeeklyDelta::for_week_of(user(), now().minus_days(7).as_date(), scores()).week_start
        );
    }
}
