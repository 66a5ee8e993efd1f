//! Progression-specific errors.

use thiserror::Error;

use super::eligibility::MissingRequirement;
use super::stage::Stage;
use crate::domain::entitlement::DenialReason;
use crate::domain::foundation::{DomainError, ValidationError};

/// Everything that can go wrong while advancing a user through the curriculum.
///
/// Denials are expected outcomes carrying actionable payloads, not opaque
/// failures; the HTTP adapter maps each variant to its own status and code.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// The requested stage is not exactly one above the current stage.
    #[error("cannot advance from stage {current} to stage {requested}")]
    InvalidTarget { current: Stage, requested: u8 },

    /// Eligibility thresholds for the target stage are not all met.
    #[error("requirements for stage {target} not met ({} missing)", missing.len())]
    NotEligible {
        target: Stage,
        missing: Vec<MissingRequirement>,
    },

    /// The access gate denied the transition.
    #[error("access denied: {0}")]
    AccessDenied(DenialReason),

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A store or billing lookup failed; nothing was persisted.
    #[error("dependency failure: {0}")]
    Dependency(DomainError),
}

impl ProgressionError {
    pub fn invalid_target(current: Stage, requested: u8) -> Self {
        ProgressionError::InvalidTarget { current, requested }
    }

    pub fn not_eligible(target: Stage, missing: Vec<MissingRequirement>) -> Self {
        ProgressionError::NotEligible { target, missing }
    }

    pub fn denied(reason: DenialReason) -> Self {
        ProgressionError::AccessDenied(reason)
    }
}

impl From<DomainError> for ProgressionError {
    fn from(err: DomainError) -> Self {
        ProgressionError::Dependency(err)
    }
}
