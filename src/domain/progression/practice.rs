//! Practice types, per-stage required sets, and practice log entries.
//!
//! Screening flags and disabled practices are closed enums end to end; the
//! boundary parses them once and business logic matches exhaustively rather
//! than threading free-form strings around.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::stage::Stage;
use crate::domain::foundation::UserId;

/// Daily practices prescribed by the curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeType {
    /// Seated meditation.
    SitPractice,
    /// Guided breathwork session.
    Breathwork,
    /// Written reflection prompt.
    Journaling,
    /// Mindful movement sequence.
    Movement,
    /// Evening gratitude note.
    GratitudeNote,
}

impl PracticeType {
    /// Snake-case name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            PracticeType::SitPractice => "sit_practice",
            PracticeType::Breathwork => "breathwork",
            PracticeType::Journaling => "journaling",
            PracticeType::Movement => "movement",
            PracticeType::GratitudeNote => "gratitude_note",
        }
    }
}

impl fmt::Display for PracticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The practices a user must complete daily at a given stage.
///
/// The set grows with the curriculum; adherence and streaks are measured
/// against it.
pub fn required_practices(stage: Stage) -> &'static [PracticeType] {
    use PracticeType::*;
    match stage.value() {
        1 => &[SitPractice],
        2 => &[SitPractice, Breathwork],
        3 => &[SitPractice, Breathwork, Journaling],
        4 => &[SitPractice, Breathwork, Journaling],
        5 => &[SitPractice, Breathwork, Journaling, Movement],
        6 => &[SitPractice, Breathwork, Journaling, Movement],
        _ => &[SitPractice, Breathwork, Journaling, Movement, GratitudeNote],
    }
}

/// The required set at `stage` minus any practices disabled for the user
/// (screening can switch individual practices off).
pub fn effective_required_practices(stage: Stage, disabled: &[PracticeType]) -> Vec<PracticeType> {
    required_practices(stage)
        .iter()
        .copied()
        .filter(|p| !disabled.contains(p))
        .collect()
}

/// One self-reported practice completion for a calendar day.
///
/// Upsert-idempotent per (user, practice, date): re-logging the same
/// practice on the same day replaces rather than duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeLogEntry {
    pub user_id: UserId,
    pub practice: PracticeType,
    pub date: NaiveDate,
    pub completed: bool,
}

impl PracticeLogEntry {
    pub fn new(user_id: UserId, practice: PracticeType, date: NaiveDate, completed: bool) -> Self {
        Self {
            user_id,
            practice,
            date,
            completed,
        }
    }
}

/// Clinical screening outcomes attached to a user's progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningFlag {
    /// A coach has approved the terminal stage-7 transition.
    ManualReviewApproved,
    /// Intake screening suggested a clinical referral.
    ClinicalReferral,
    /// Trauma-sensitive variant of the curriculum applies.
    TraumaSensitive,
}
