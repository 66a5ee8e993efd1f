//! HTTP handlers for the progress endpoint.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The POST endpoint dispatches on the request's `action` field;
//! the GET endpoint returns the full snapshot.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::middleware::{RateLimitCheck, RequireAuth};
use crate::application::handlers::progress::{
    CheckUnlockHandler, CheckUnlockQuery, GetProgressHandler, GetProgressQuery,
    RecalculateProgressCommand, RecalculateProgressHandler, RecordWeeklyDeltaCommand,
    RecordWeeklyDeltaHandler, UnlockStageCommand, UnlockStageHandler,
};
use crate::domain::assessment::DomainScoreSet;
use crate::domain::progression::ProgressionError;
use crate::ports::{OperationCategory, ProgressStore, RateLimiter, SubscriptionReader};

use super::dto::{
    CheckUnlockResponse, ErrorResponse, MissingRequirementResponse, ProgressActionRequest,
    ProgressSnapshotResponse, RecalculateResponse, UnlockStageResponse, WeeklyDeltaResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct ProgressAppState {
    pub progress_store: Arc<dyn ProgressStore>,
    pub subscription_reader: Arc<dyn SubscriptionReader>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Where to send users on entitlement denials.
    pub upgrade_url: String,
}

impl ProgressAppState {
    /// Create handlers on demand from the shared state.
    pub fn recalculate_handler(&self) -> RecalculateProgressHandler {
        RecalculateProgressHandler::new(self.progress_store.clone())
    }

    pub fn check_unlock_handler(&self) -> CheckUnlockHandler {
        CheckUnlockHandler::new(self.progress_store.clone(), self.subscription_reader.clone())
    }

    pub fn unlock_stage_handler(&self) -> UnlockStageHandler {
        UnlockStageHandler::new(self.progress_store.clone(), self.subscription_reader.clone())
    }

    pub fn weekly_delta_handler(&self) -> RecordWeeklyDeltaHandler {
        RecordWeeklyDeltaHandler::new(self.progress_store.clone())
    }

    pub fn rate_limit_check(&self) -> RateLimitCheck {
        RateLimitCheck::new(self.rate_limiter.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Route Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/progress - Full progress snapshot for the authenticated user.
pub async fn get_progress(
    State(state): State<ProgressAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, ProgressApiError> {
    let handler = GetProgressHandler::new(
        state.progress_store.clone(),
        state.subscription_reader.clone(),
    );
    let query = GetProgressQuery { user_id: user.id };

    let snapshot = handler
        .handle(query)
        .await
        .map_err(|e| ProgressApiError::new(e, &state.upgrade_url))?;

    Ok(Json(ProgressSnapshotResponse::from(snapshot)))
}

/// POST /api/progress - Dispatch a progress action for the authenticated user.
pub async fn post_progress(
    State(state): State<ProgressAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ProgressActionRequest>,
) -> Result<axum::response::Response, ProgressApiError> {
    let user_id = user.id;

    match request {
        ProgressActionRequest::Recalculate { reports } => {
            let handler = state.recalculate_handler();
            let cmd = RecalculateProgressCommand {
                user_id,
                reports: reports.into_iter().map(Into::into).collect(),
            };
            let result = handler
                .handle(cmd)
                .await
                .map_err(|e| ProgressApiError::new(e, &state.upgrade_url))?;
            Ok(Json(RecalculateResponse::from(result)).into_response())
        }

        ProgressActionRequest::CheckUnlock {} => {
            let handler = state.check_unlock_handler();
            let query = CheckUnlockQuery { user_id };
            let result = handler
                .handle(query)
                .await
                .map_err(|e| ProgressApiError::new(e, &state.upgrade_url))?;
            Ok(Json(CheckUnlockResponse::from(result)).into_response())
        }

        ProgressActionRequest::UnlockStage { target_stage } => {
            // Unlocks draw from a tighter budget than plain writes.
            if let Err(rejection) = state
                .rate_limit_check()
                .check(&user_id, OperationCategory::Unlock)
                .await
            {
                return Ok(rejection.into_response());
            }

            let handler = state.unlock_stage_handler();
            let cmd = UnlockStageCommand {
                user_id,
                target_stage,
            };
            let result = handler
                .handle(cmd)
                .await
                .map_err(|e| ProgressApiError::new(e, &state.upgrade_url))?;
            Ok(Json(UnlockStageResponse::from(result)).into_response())
        }

        ProgressActionRequest::WeeklyDelta { scores } => {
            let scores = DomainScoreSet::try_from(scores)
                .map_err(|e| ProgressApiError::new(e.into(), &state.upgrade_url))?;
            let handler = state.weekly_delta_handler();
            let cmd = RecordWeeklyDeltaCommand { user_id, scores };
            let result = handler
                .handle(cmd)
                .await
                .map_err(|e| ProgressApiError::new(e, &state.upgrade_url))?;
            Ok(Json(WeeklyDeltaResponse::from(result)).into_response())
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts progression errors to HTTP responses.
pub struct ProgressApiError {
    error: ProgressionError,
    upgrade_url: String,
}

impl ProgressApiError {
    pub fn new(error: ProgressionError, upgrade_url: &str) -> Self {
        Self {
            error,
            upgrade_url: upgrade_url.to_string(),
        }
    }
}

impl IntoResponse for ProgressApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self.error {
            ProgressionError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_FAILED", e.to_string()),
            ),

            ProgressionError::InvalidTarget { current, requested } => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new(
                    "PROGRESSION_DENIED",
                    format!(
                        "Cannot advance from stage {} to stage {}; stages unlock one at a time",
                        current, requested
                    ),
                ),
            ),

            ProgressionError::NotEligible { target, missing } => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new(
                    "PROGRESSION_DENIED",
                    format!("Requirements for stage {} are not met", target),
                )
                .with_missing(
                    missing
                        .into_iter()
                        .map(MissingRequirementResponse::from)
                        .collect(),
                ),
            ),

            ProgressionError::AccessDenied(reason) => {
                let mut body = ErrorResponse::new(reason.code(), reason.to_string());
                if reason.suggests_upgrade() {
                    body = body.with_upgrade_url(self.upgrade_url);
                }
                (StatusCode::FORBIDDEN, body)
            }

            ProgressionError::Dependency(e) => {
                tracing::error!(code = %e.code, "Progress operation failed: {}", e.message);
                let body = if e.is_dependency_failure() {
                    ErrorResponse::new("DEPENDENCY_UNAVAILABLE", "A backing service is unavailable")
                } else {
                    ErrorResponse::new("INTERNAL_ERROR", "Internal error")
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::DenialReason;
    use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
    use crate::domain::progression::{MissingRequirement, Requirement, Stage};

    fn api_error(error: ProgressionError) -> ProgressApiError {
        ProgressApiError::new(error, "https://example.com/upgrade")
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn validation_maps_to_400() {
        let err = api_error(ProgressionError::Validation(ValidationError::out_of_range(
            "target_stage",
            1.0,
            7.0,
            9.0,
        )));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_target_maps_to_403() {
        let err = api_error(ProgressionError::invalid_target(Stage::FIRST, 4));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_eligible_maps_to_403() {
        let missing = vec![MissingRequirement {
            requirement: Requirement::Adherence,
            current: "75%".to_string(),
            required: "80%".to_string(),
            message: "Adherence too low".to_string(),
        }];
        let err = api_error(ProgressionError::not_eligible(
            Stage::try_new(3).unwrap(),
            missing,
        ));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn access_denied_maps_to_403() {
        let err = api_error(ProgressionError::denied(DenialReason::NoSubscription));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn stage_locked_denial_maps_to_403() {
        let err = api_error(ProgressionError::denied(DenialReason::StageLocked));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn dependency_timeout_maps_to_500() {
        let err = api_error(ProgressionError::Dependency(DomainError::new(
            ErrorCode::DependencyTimeout,
            "billing lookup timed out",
        )));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn exhausted_retries_map_to_500() {
        let err = api_error(ProgressionError::Dependency(DomainError::new(
            ErrorCode::StaleStage,
            "conditional write kept losing",
        )));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
