//! Domain score value objects.
//!
//! Self-report questionnaires are scored into four wellbeing domains, each
//! on a 0-5 scale. The set is immutable once constructed; validation happens
//! at the boundary so downstream math never sees an out-of-range score.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// The four measured wellbeing domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDomain {
    /// Emotional regulation under stress.
    Regulation,
    /// Present-moment awareness.
    Awareness,
    /// Outlook and positive affect.
    Outlook,
    /// Sustained attention.
    Attention,
}

impl ScoreDomain {
    /// All domains, in canonical order.
    pub const ALL: [ScoreDomain; 4] = [
        ScoreDomain::Regulation,
        ScoreDomain::Awareness,
        ScoreDomain::Outlook,
        ScoreDomain::Attention,
    ];

    /// Snake-case name used on the wire and in messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScoreDomain::Regulation => "regulation",
            ScoreDomain::Awareness => "awareness",
            ScoreDomain::Outlook => "outlook",
            ScoreDomain::Attention => "attention",
        }
    }
}

impl fmt::Display for ScoreDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One score per wellbeing domain, each in [0, 5].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScoreSet {
    pub regulation: f64,
    pub awareness: f64,
    pub outlook: f64,
    pub attention: f64,
}

impl DomainScoreSet {
    /// Creates a score set, validating every domain against [0, 5].
    pub fn try_new(
        regulation: f64,
        awareness: f64,
        outlook: f64,
        attention: f64,
    ) -> Result<Self, ValidationError> {
        let set = Self {
            regulation,
            awareness,
            outlook,
            attention,
        };
        set.validate()?;
        Ok(set)
    }

    /// Validates every domain score, including NaN rejection.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for domain in ScoreDomain::ALL {
            let value = self.score(domain);
            if !value.is_finite() || !(0.0..=5.0).contains(&value) {
                return Err(ValidationError::out_of_range(domain.name(), 0.0, 5.0, value));
            }
        }
        Ok(())
    }

    /// Returns the score for a single domain.
    pub fn score(&self, domain: ScoreDomain) -> f64 {
        match domain {
            ScoreDomain::Regulation => self.regulation,
            ScoreDomain::Awareness => self.awareness,
            ScoreDomain::Outlook => self.outlook,
            ScoreDomain::Attention => self.attention,
        }
    }

    /// Mean of the four domain scores.
    pub fn mean(&self) -> f64 {
        (self.regulation + self.awareness + self.outlook + self.attention) / 4.0
    }
}

/// The onboarding measurement a user's later deltas are computed against.
///
/// Written exactly once per user; routine flows never overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub user_id: UserId,
    pub scores: DomainScoreSet,
    pub captured_at: Timestamp,
}

impl BaselineRecord {
    pub fn new(user_id: UserId, scores: DomainScoreSet, captured_at: Timestamp) -> Self {
        Self {
            user_id,
            scores,
            captured_at,
        }
    }
}
