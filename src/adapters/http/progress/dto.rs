//! HTTP DTOs (Data Transfer Objects) for the progress endpoint.
//!
//! These types define the JSON request/response structure for the progress
//! API. They serve as the boundary between HTTP and the application layer.
//! Payloads never carry a user id; the acting user always comes from the
//! authenticated session.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::handlers::progress::{
    CheckUnlockResult, PracticeReport, ProgressSnapshot, RecalculateProgressResult,
    RecordWeeklyDeltaResult, UnlockStageResult,
};
use crate::domain::assessment::{DomainScoreSet, ScoreDelta, WeeklyDelta};
use crate::domain::entitlement::{AccessDecision, Entitlement};
use crate::domain::progression::{
    EligibilityResult, MissingRequirement, PracticeType, Requirement,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/progress request body, discriminated by `action`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProgressActionRequest {
    /// Report completed practices and recompute adherence metrics.
    Recalculate {
        #[serde(default)]
        reports: Vec<PracticeReportRequest>,
    },
    /// Preview whether the next stage can be unlocked. No writes.
    CheckUnlock {},
    /// Attempt to unlock a stage.
    #[serde(rename_all = "camelCase")]
    UnlockStage { target_stage: u8 },
    /// Submit this week's self-assessment scores.
    WeeklyDelta { scores: ScoresRequest },
}

/// One practice completion report.
#[derive(Debug, Clone, Deserialize)]
pub struct PracticeReportRequest {
    pub practice: PracticeType,
    pub date: NaiveDate,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

impl From<PracticeReportRequest> for PracticeReport {
    fn from(request: PracticeReportRequest) -> Self {
        Self {
            practice: request.practice,
            date: request.date,
            completed: request.completed,
        }
    }
}

/// Raw 1-5 scores for the four assessment domains.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoresRequest {
    pub regulation: f64,
    pub awareness: f64,
    pub outlook: f64,
    pub attention: f64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response for a recalculate action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateResponse {
    pub current_stage: u8,
    pub adherence: u8,
    pub consecutive_days: u32,
}

impl From<RecalculateProgressResult> for RecalculateResponse {
    fn from(result: RecalculateProgressResult) -> Self {
        Self {
            current_stage: result.state.current_stage.value(),
            adherence: result.state.adherence.value(),
            consecutive_days: result.state.consecutive_days,
        }
    }
}

/// Response for an unlock preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckUnlockResponse {
    pub current_stage: u8,
    /// Null when the user is at the terminal stage.
    pub target_stage: Option<u8>,
    pub can_unlock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessDecision>,
}

impl From<CheckUnlockResult> for CheckUnlockResponse {
    fn from(result: CheckUnlockResult) -> Self {
        Self {
            current_stage: result.current_stage.value(),
            target_stage: result.target_stage.map(|s| s.value()),
            can_unlock: result.can_unlock,
            eligibility: result.eligibility.map(EligibilityResponse::from),
            access: result.access,
        }
    }
}

/// Requirement status for a prospective unlock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub missing: Vec<MissingRequirementResponse>,
}

impl From<EligibilityResult> for EligibilityResponse {
    fn from(result: EligibilityResult) -> Self {
        Self {
            eligible: result.eligible,
            missing: result
                .missing
                .into_iter()
                .map(MissingRequirementResponse::from)
                .collect(),
        }
    }
}

/// One unmet requirement with its current and required values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRequirementResponse {
    pub requirement: Requirement,
    pub current: String,
    pub required: String,
    pub message: String,
}

impl From<MissingRequirement> for MissingRequirementResponse {
    fn from(missing: MissingRequirement) -> Self {
        Self {
            requirement: missing.requirement,
            current: missing.current,
            required: missing.required,
            message: missing.message,
        }
    }
}

/// Response for a successful stage unlock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockStageResponse {
    pub new_stage: u8,
    pub stage_started_at: String,
}

impl From<UnlockStageResult> for UnlockStageResponse {
    fn from(result: UnlockStageResult) -> Self {
        Self {
            new_stage: result.new_stage.value(),
            stage_started_at: result.stage_started_at.as_datetime().to_rfc3339(),
        }
    }
}

/// Response for a weekly score submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDeltaResponse {
    /// Composite index 0-100 derived from this week's scores.
    pub index: u8,
    pub tier: String,
    /// True when this submission became the user's baseline.
    pub baseline_created: bool,
    pub delta: ScoreDeltaResponse,
}

impl From<RecordWeeklyDeltaResult> for WeeklyDeltaResponse {
    fn from(result: RecordWeeklyDeltaResult) -> Self {
        Self {
            index: result.index.value(),
            tier: result.tier.name().to_string(),
            baseline_created: result.baseline_created,
            delta: ScoreDeltaResponse::from(result.delta),
        }
    }
}

/// Per-domain deltas relative to the baseline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDeltaResponse {
    pub regulation: f64,
    pub awareness: f64,
    pub outlook: f64,
    pub attention: f64,
    pub average: f64,
}

impl From<ScoreDelta> for ScoreDeltaResponse {
    fn from(delta: ScoreDelta) -> Self {
        Self {
            regulation: delta.regulation,
            awareness: delta.awareness,
            outlook: delta.outlook,
            attention: delta.attention,
            average: delta.average,
        }
    }
}

/// GET /api/progress response: the full dashboard snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshotResponse {
    pub current_stage: u8,
    pub stage_started_at: String,
    pub adherence: u8,
    pub consecutive_days: u32,
    pub entitlement: EntitlementResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub has_baseline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_scores: Option<ScoresResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<ScoreDeltaResponse>,
    pub next_stage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityResponse>,
}

impl From<ProgressSnapshot> for ProgressSnapshotResponse {
    fn from(snapshot: ProgressSnapshot) -> Self {
        let ProgressSnapshot {
            state,
            entitlement,
            index,
            tier,
            latest_measurement,
            delta,
            has_baseline,
            next_stage,
            eligibility,
        } = snapshot;

        Self {
            current_stage: state.current_stage.value(),
            stage_started_at: state.stage_started_at.as_datetime().to_rfc3339(),
            adherence: state.adherence.value(),
            consecutive_days: state.consecutive_days,
            entitlement: EntitlementResponse::from(&entitlement),
            index: index.map(|i| i.value()),
            tier: tier.map(|t| t.name().to_string()),
            has_baseline,
            latest_scores: latest_measurement.map(ScoresResponse::from),
            delta: delta.map(ScoreDeltaResponse::from),
            next_stage: next_stage.map(|s| s.value()),
            eligibility: eligibility.map(EligibilityResponse::from),
        }
    }
}

/// Scores from the most recent weekly measurement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresResponse {
    pub week_start: NaiveDate,
    pub regulation: f64,
    pub awareness: f64,
    pub outlook: f64,
    pub attention: f64,
    pub average: f64,
}

impl From<WeeklyDelta> for ScoresResponse {
    fn from(measurement: WeeklyDelta) -> Self {
        Self {
            week_start: measurement.week_start,
            regulation: measurement.scores.regulation,
            awareness: measurement.scores.awareness,
            outlook: measurement.scores.outlook,
            attention: measurement.scores.attention,
            average: measurement.average_score,
        }
    }
}

/// The entitlement half of the snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub is_active: bool,
    pub max_allowed_stage: u8,
    pub has_coaching_access: bool,
    pub has_lapsed_subscription: bool,
}

impl From<&Entitlement> for EntitlementResponse {
    fn from(entitlement: &Entitlement) -> Self {
        Self {
            is_active: entitlement.is_active,
            max_allowed_stage: entitlement.max_allowed_stage.value(),
            has_coaching_access: entitlement.has_coaching_access,
            has_lapsed_subscription: entitlement.has_lapsed_subscription,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Where to upgrade, present on entitlement denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_url: Option<String>,
    /// Unmet requirements, present on eligibility denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<MissingRequirementResponse>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            upgrade_url: None,
            missing: None,
        }
    }

    pub fn with_upgrade_url(mut self, url: impl Into<String>) -> Self {
        self.upgrade_url = Some(url.into());
        self
    }

    pub fn with_missing(mut self, missing: Vec<MissingRequirementResponse>) -> Self {
        self.missing = Some(missing);
        self
    }
}

/// Converts raw request scores into the validated domain set.
impl TryFrom<ScoresRequest> for DomainScoreSet {
    type Error = crate::domain::foundation::ValidationError;

    fn try_from(request: ScoresRequest) -> Result<Self, Self::Error> {
        DomainScoreSet::try_new(
            request.regulation,
            request.awareness,
            request.outlook,
            request.attention,
        )
    }
}
