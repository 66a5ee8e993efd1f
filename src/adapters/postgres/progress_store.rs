//! PostgreSQL implementation of ProgressStore.
//!
//! Expected schema:
//!
//! ```text
//! user_progress   (user_id TEXT PRIMARY KEY, current_stage SMALLINT,
//!                  stage_started_at TIMESTAMPTZ, adherence SMALLINT,
//!                  consecutive_days INTEGER, screening_flags TEXT[],
//!                  disabled_practices TEXT[], updated_at TIMESTAMPTZ)
//! practice_logs   (user_id TEXT, practice TEXT, log_date DATE,
//!                  completed BOOLEAN,
//!                  PRIMARY KEY (user_id, practice, log_date))
//! baselines       (user_id TEXT PRIMARY KEY, regulation DOUBLE PRECISION,
//!                  awareness DOUBLE PRECISION, outlook DOUBLE PRECISION,
//!                  attention DOUBLE PRECISION, captured_at TIMESTAMPTZ)
//! weekly_deltas   (user_id TEXT, week_start DATE, regulation DOUBLE PRECISION,
//!                  awareness DOUBLE PRECISION, outlook DOUBLE PRECISION,
//!                  attention DOUBLE PRECISION, average_score DOUBLE PRECISION,
//!                  PRIMARY KEY (user_id, week_start))
//! ```
//!
//! The stage advance is a single `UPDATE ... WHERE user_id = $1 AND
//! current_stage = $2`; the affected-row count distinguishes success from a
//! lost race.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::assessment::{BaselineRecord, DomainScoreSet, WeeklyDelta};
use crate::domain::foundation::{DomainError, ErrorCode, Percentage, Timestamp, UserId};
use crate::domain::progression::{
    PracticeLogEntry, PracticeType, ProgressState, ScreeningFlag, Stage,
};
use crate::ports::{ProgressStore, UpdateOutcome};

/// PostgreSQL implementation of the ProgressStore port.
pub struct PostgresProgressStore {
    pool: PgPool,
}

impl PostgresProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProgressRow {
    user_id: String,
    current_stage: i16,
    stage_started_at: DateTime<Utc>,
    adherence: i16,
    consecutive_days: i32,
    screening_flags: Vec<String>,
    disabled_practices: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgressRow> for ProgressState {
    type Error = DomainError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        let current_stage = Stage::try_new(row.current_stage as u8)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        let screening_flags = row
            .screening_flags
            .iter()
            .map(|s| parse_flag(s))
            .collect::<Result<_, _>>()?;
        let disabled_practices = row
            .disabled_practices
            .iter()
            .map(|s| parse_practice(s))
            .collect::<Result<_, _>>()?;

        Ok(ProgressState {
            user_id,
            current_stage,
            stage_started_at: Timestamp::from_datetime(row.stage_started_at),
            adherence: Percentage::new(row.adherence.clamp(0, 100) as u8),
            consecutive_days: row.consecutive_days.max(0) as u32,
            screening_flags,
            disabled_practices,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    user_id: String,
    practice: String,
    log_date: NaiveDate,
    completed: bool,
}

impl TryFrom<LogRow> for PracticeLogEntry {
    type Error = DomainError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        Ok(PracticeLogEntry::new(
            user_id,
            parse_practice(&row.practice)?,
            row.log_date,
            row.completed,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScoreRow {
    user_id: String,
    regulation: f64,
    awareness: f64,
    outlook: f64,
    attention: f64,
}

fn scores_from_row(row: &ScoreRow) -> Result<DomainScoreSet, DomainError> {
    DomainScoreSet::try_new(row.regulation, row.awareness, row.outlook, row.attention)
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))
}

fn parse_practice(s: &str) -> Result<PracticeType, DomainError> {
    match s {
        "sit_practice" => Ok(PracticeType::SitPractice),
        "breathwork" => Ok(PracticeType::Breathwork),
        "journaling" => Ok(PracticeType::Journaling),
        "movement" => Ok(PracticeType::Movement),
        "gratitude_note" => Ok(PracticeType::GratitudeNote),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid practice value: {}", s),
        )),
    }
}

fn parse_flag(s: &str) -> Result<ScreeningFlag, DomainError> {
    match s {
        "manual_review_approved" => Ok(ScreeningFlag::ManualReviewApproved),
        "clinical_referral" => Ok(ScreeningFlag::ClinicalReferral),
        "trauma_sensitive" => Ok(ScreeningFlag::TraumaSensitive),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid screening flag value: {}", s),
        )),
    }
}

fn flag_to_string(flag: &ScreeningFlag) -> &'static str {
    match flag {
        ScreeningFlag::ManualReviewApproved => "manual_review_approved",
        ScreeningFlag::ClinicalReferral => "clinical_referral",
        ScreeningFlag::TraumaSensitive => "trauma_sensitive",
    }
}

fn flags_to_strings(flags: &[ScreeningFlag]) -> Vec<String> {
    flags.iter().map(|f| flag_to_string(f).to_string()).collect()
}

fn practices_to_strings(practices: &[PracticeType]) -> Vec<String> {
    practices.iter().map(|p| p.name().to_string()).collect()
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl ProgressStore for PostgresProgressStore {
    async fn get_progress(&self, user_id: &UserId) -> Result<Option<ProgressState>, DomainError> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT user_id, current_stage, stage_started_at, adherence,
                   consecutive_days, screening_flags, disabled_practices, updated_at
            FROM user_progress
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load progress", e))?;

        row.map(ProgressState::try_from).transpose()
    }

    async fn create_progress(&self, state: &ProgressState) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_progress (
                user_id, current_stage, stage_started_at, adherence,
                consecutive_days, screening_flags, disabled_practices, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(state.user_id.as_str())
        .bind(i16::from(state.current_stage.value()))
        .bind(state.stage_started_at.as_datetime())
        .bind(i16::from(state.adherence.value()))
        .bind(state.consecutive_days as i32)
        .bind(flags_to_strings(&state.screening_flags))
        .bind(practices_to_strings(&state.disabled_practices))
        .bind(state.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("user_progress_pkey") {
                    return DomainError::validation(
                        "user_id",
                        "User already has a progress record",
                    );
                }
            }
            db_error("Failed to create progress", e)
        })?;

        Ok(())
    }

    async fn update_progress_if_stage(
        &self,
        state: &ProgressState,
        expected_stage: Stage,
    ) -> Result<UpdateOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_progress SET
                current_stage = $3,
                stage_started_at = $4,
                adherence = $5,
                consecutive_days = $6,
                screening_flags = $7,
                disabled_practices = $8,
                updated_at = $9
            WHERE user_id = $1 AND current_stage = $2
            "#,
        )
        .bind(state.user_id.as_str())
        .bind(i16::from(expected_stage.value()))
        .bind(i16::from(state.current_stage.value()))
        .bind(state.stage_started_at.as_datetime())
        .bind(i16::from(state.adherence.value()))
        .bind(state.consecutive_days as i32)
        .bind(flags_to_strings(&state.screening_flags))
        .bind(practices_to_strings(&state.disabled_practices))
        .bind(state.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update progress", e))?;

        if result.rows_affected() > 0 {
            return Ok(UpdateOutcome::Applied);
        }

        // Zero rows: either the row moved on or it never existed.
        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM user_progress WHERE user_id = $1")
                .bind(state.user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to check progress row", e))?;

        if exists.is_some() {
            Ok(UpdateOutcome::StaleStage)
        } else {
            Err(DomainError::new(
                ErrorCode::ProgressNotFound,
                format!("No progress record for user {}", state.user_id),
            ))
        }
    }

    async fn upsert_practice_log(&self, entry: &PracticeLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO practice_logs (user_id, practice, log_date, completed)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, practice, log_date)
            DO UPDATE SET completed = EXCLUDED.completed
            "#,
        )
        .bind(entry.user_id.as_str())
        .bind(entry.practice.name())
        .bind(entry.date)
        .bind(entry.completed)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert practice log", e))?;

        Ok(())
    }

    async fn practice_logs_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<PracticeLogEntry>, DomainError> {
        let rows: Vec<LogRow> = sqlx::query_as(
            r#"
            SELECT user_id, practice, log_date, completed
            FROM practice_logs
            WHERE user_id = $1 AND log_date >= $2
            ORDER BY log_date
            "#,
        )
        .bind(user_id.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load practice logs", e))?;

        rows.into_iter().map(PracticeLogEntry::try_from).collect()
    }

    async fn get_baseline(&self, user_id: &UserId) -> Result<Option<BaselineRecord>, DomainError> {
        #[derive(sqlx::FromRow)]
        struct BaselineRow {
            #[sqlx(flatten)]
            scores: ScoreRow,
            captured_at: DateTime<Utc>,
        }

        let row: Option<BaselineRow> = sqlx::query_as(
            r#"
            SELECT user_id, regulation, awareness, outlook, attention, captured_at
            FROM baselines
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load baseline", e))?;

        row.map(|row| {
            let user_id = UserId::new(row.scores.user_id.clone())
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
            Ok(BaselineRecord::new(
                user_id,
                scores_from_row(&row.scores)?,
                Timestamp::from_datetime(row.captured_at),
            ))
        })
        .transpose()
    }

    async fn save_baseline(&self, baseline: &BaselineRecord) -> Result<(), DomainError> {
        // ON CONFLICT DO NOTHING + rows_affected gives write-once without a
        // read-modify-write race.
        let result = sqlx::query(
            r#"
            INSERT INTO baselines (user_id, regulation, awareness, outlook, attention, captured_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(baseline.user_id.as_str())
        .bind(baseline.scores.regulation)
        .bind(baseline.scores.awareness)
        .bind(baseline.scores.outlook)
        .bind(baseline.scores.attention)
        .bind(baseline.captured_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save baseline", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::BaselineAlreadyExists,
                format!("Baseline already recorded for user {}", baseline.user_id),
            ));
        }

        Ok(())
    }

    async fn save_weekly_delta(&self, delta: &WeeklyDelta) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO weekly_deltas (
                user_id, week_start, regulation, awareness, outlook, attention, average_score
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, week_start)
            DO UPDATE SET
                regulation = EXCLUDED.regulation,
                awareness = EXCLUDED.awareness,
                outlook = EXCLUDED.outlook,
                attention = EXCLUDED.attention,
                average_score = EXCLUDED.average_score
            "#,
        )
        .bind(delta.user_id.as_str())
        .bind(delta.week_start)
        .bind(delta.scores.regulation)
        .bind(delta.scores.awareness)
        .bind(delta.scores.outlook)
        .bind(delta.scores.attention)
        .bind(delta.average_score)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save weekly delta", e))?;

        Ok(())
    }

    async fn latest_weekly_delta(
        &self,
        user_id: &UserId,
    ) -> Result<Option<WeeklyDelta>, DomainError> {
        #[derive(sqlx::FromRow)]
        struct DeltaRow {
            #[sqlx(flatten)]
            scores: ScoreRow,
            week_start: NaiveDate,
        }

        let row: Option<DeltaRow> = sqlx::query_as(
            r#"
            SELECT user_id, week_start, regulation, awareness, outlook, attention
            FROM weekly_deltas
            WHERE user_id = $1
            ORDER BY week_start DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load weekly delta", e))?;

        row.map(|row| {
            let user_id = UserId::new(row.scores.user_id.clone())
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
            Ok(WeeklyDelta::for_week_of(
                user_id,
                row.week_start,
                scores_from_row(&row.scores)?,
            ))
        })
        .transpose()
    }
}
