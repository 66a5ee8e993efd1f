//! Progression module - Stages, practice tracking, and eligibility.

mod adherence;
mod eligibility;
mod errors;
mod practice;
mod stage;
mod state;

pub use adherence::{calculate_adherence, calculate_consecutive_days, DEFAULT_WINDOW_DAYS};
pub use eligibility::{
    evaluate, thresholds_for_target, EligibilityInput, EligibilityResult, MissingRequirement,
    Requirement, StageThresholds,
};
pub use errors::ProgressionError;
pub use practice::{
    effective_required_practices, required_practices, PracticeLogEntry, PracticeType,
    ScreeningFlag,
};
pub use stage::Stage;
pub use state::ProgressState;
