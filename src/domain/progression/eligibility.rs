//! Per-stage eligibility evaluation.
//!
//! Each unlock target carries a threshold row; the rows get strictly harder
//! as the curriculum deepens, and the terminal stage is never satisfiable by
//! numbers alone. The `missing` list is emitted in a fixed order (adherence,
//! consecutive days, delta, manual review) so client UIs render consistent
//! guidance.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::stage::Stage;
use crate::domain::assessment::{ScoreDelta, ScoreDomain};
use crate::domain::foundation::Percentage;

/// Numeric requirements for unlocking one target stage.
#[derive(Debug, Clone, Copy)]
pub struct StageThresholds {
    pub min_adherence: u8,
    pub min_consecutive_days: u32,
    pub min_average_delta: f64,
    /// Domains whose average delta the requirement is measured over.
    pub delta_domains: &'static [ScoreDomain],
}

/// Thresholds for unlocking `target`, or None where numbers don't apply
/// (stage 1 is the entry stage; stage 7 is manual-review only).
pub fn thresholds_for_target(target: Stage) -> Option<&'static StageThresholds> {
    use ScoreDomain::*;

    static STAGE_2: StageThresholds = StageThresholds {
        min_adherence: 70,
        min_consecutive_days: 7,
        min_average_delta: 0.3,
        delta_domains: &[Regulation],
    };
    static STAGE_3: StageThresholds = StageThresholds {
        min_adherence: 80,
        min_consecutive_days: 14,
        min_average_delta: 0.5,
        delta_domains: &[Regulation, Awareness],
    };
    static STAGE_4: StageThresholds = StageThresholds {
        min_adherence: 85,
        min_consecutive_days: 18,
        min_average_delta: 0.6,
        delta_domains: &[Awareness, Outlook],
    };
    static STAGE_5: StageThresholds = StageThresholds {
        min_adherence: 88,
        min_consecutive_days: 21,
        min_average_delta: 0.7,
        delta_domains: &[Outlook, Attention],
    };
    static STAGE_6: StageThresholds = StageThresholds {
        min_adherence: 90,
        min_consecutive_days: 25,
        min_average_delta: 0.8,
        delta_domains: &ScoreDomain::ALL,
    };

    match target.value() {
        2 => Some(&STAGE_2),
        3 => Some(&STAGE_3),
        4 => Some(&STAGE_4),
        5 => Some(&STAGE_5),
        6 => Some(&STAGE_6),
        _ => None,
    }
}

/// The kinds of requirement a user can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Adherence,
    ConsecutiveDays,
    Delta,
    ManualReview,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Requirement::Adherence => "adherence",
            Requirement::ConsecutiveDays => "consecutive_days",
            Requirement::Delta => "delta",
            Requirement::ManualReview => "manual_review",
        };
        write!(f, "{}", s)
    }
}

/// One unmet requirement, with current and required values for UI rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRequirement {
    pub requirement: Requirement,
    pub current: String,
    pub required: String,
    pub message: String,
}

/// Outcome of an eligibility evaluation. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub missing: Vec<MissingRequirement>,
}

impl EligibilityResult {
    fn from_missing(missing: Vec<MissingRequirement>) -> Self {
        Self {
            eligible: missing.is_empty(),
            missing,
        }
    }
}

/// Everything the evaluator needs, already measured.
#[derive(Debug, Clone)]
pub struct EligibilityInput<'a> {
    pub target: Stage,
    pub adherence: Percentage,
    pub consecutive_days: u32,
    /// Latest baseline-relative delta, if a periodic measurement exists.
    pub delta: Option<&'a ScoreDelta>,
    /// Whether a coach has approved the terminal transition.
    pub manual_review_approved: bool,
}

/// Evaluates eligibility for unlocking `input.target`.
pub fn evaluate(input: &EligibilityInput<'_>) -> EligibilityResult {
    // Terminal stage: manual review is the only gate, and it is never
    // satisfied by the numbers.
    if input.target.is_terminal() {
        let missing = if input.manual_review_approved {
            vec![]
        } else {
            vec![MissingRequirement {
                requirement: Requirement::ManualReview,
                current: "pending".to_string(),
                required: "approved".to_string(),
                message: "Stage 7 requires a coach review before it can be unlocked.".to_string(),
            }]
        };
        return EligibilityResult::from_missing(missing);
    }

    let Some(thresholds) = thresholds_for_target(input.target) else {
        // Stage 1 has no unlock requirements.
        return EligibilityResult::from_missing(vec![]);
    };

    let mut missing = Vec::new();

    if input.adherence.value() < thresholds.min_adherence {
        missing.push(MissingRequirement {
            requirement: Requirement::Adherence,
            current: format!("{}", input.adherence),
            required: format!("{}%", thresholds.min_adherence),
            message: format!(
                "Complete at least {}% of your required practices over the last two weeks.",
                thresholds.min_adherence
            ),
        });
    }

    if input.consecutive_days < thresholds.min_consecutive_days {
        missing.push(MissingRequirement {
            requirement: Requirement::ConsecutiveDays,
            current: input.consecutive_days.to_string(),
            required: thresholds.min_consecutive_days.to_string(),
            message: format!(
                "Keep an unbroken run of {} fully-completed days.",
                thresholds.min_consecutive_days
            ),
        });
    }

    let average_delta = input
        .delta
        .map(|d| d.average_over(thresholds.delta_domains))
        .unwrap_or(0.0);
    if average_delta < thresholds.min_average_delta {
        let domains: Vec<&str> = thresholds.delta_domains.iter().map(|d| d.name()).collect();
        missing.push(MissingRequirement {
            requirement: Requirement::Delta,
            current: format!("{:.2}", average_delta),
            required: format!("{:.2}", thresholds.min_average_delta),
            message: format!(
                "Improve your {} scores by {:.1} points on average from baseline.",
                domains.join(", "),
                thresholds.min_average_delta
            ),
        });
    }

    EligibilityResult::from_missing(missing)
}
