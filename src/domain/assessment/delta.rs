//! Delta calculation between baseline and periodic measurements.
//!
//! Pure arithmetic: no I/O, no failure modes beyond what the validated
//! inputs already rule out.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::scores::{DomainScoreSet, ScoreDomain};
use crate::domain::foundation::UserId;

/// Per-domain change relative to the onboarding baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub regulation: f64,
    pub awareness: f64,
    pub outlook: f64,
    pub attention: f64,
    /// Mean of the four per-domain deltas.
    pub average: f64,
}

impl ScoreDelta {
    /// Computes `current - baseline` per domain, rounded to 2 decimals.
    pub fn between(baseline: &DomainScoreSet, current: &DomainScoreSet) -> Self {
        let regulation = round2(current.regulation - baseline.regulation);
        let awareness = round2(current.awareness - baseline.awareness);
        let outlook = round2(current.outlook - baseline.outlook);
        let attention = round2(current.attention - baseline.attention);
        let average = round2((regulation + awareness + outlook + attention) / 4.0);
        Self {
            regulation,
            awareness,
            outlook,
            attention,
            average,
        }
    }

    /// Returns the delta for a single domain.
    pub fn delta(&self, domain: ScoreDomain) -> f64 {
        match domain {
            ScoreDomain::Regulation => self.regulation,
            ScoreDomain::Awareness => self.awareness,
            ScoreDomain::Outlook => self.outlook,
            ScoreDomain::Attention => self.attention,
        }
    }

    /// Average delta over a subset of domains.
    ///
    /// Stage thresholds weigh different domains at different points in the
    /// curriculum, so eligibility asks for subset averages. An empty subset
    /// yields 0.0.
    pub fn average_over(&self, domains: &[ScoreDomain]) -> f64 {
        if domains.is_empty() {
            return 0.0;
        }
        let sum: f64 = domains.iter().map(|d| self.delta(*d)).sum();
        round2(sum / domains.len() as f64)
    }
}

/// Weekly measurement snapshot, unique per (user, week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDelta {
    pub user_id: UserId,
    /// Monday of the measurement week.
    pub week_start: NaiveDate,
    pub scores: DomainScoreSet,
    pub average_score: f64,
}

impl WeeklyDelta {
    /// Builds a snapshot for the week containing `date`.
    pub fn for_week_of(user_id: UserId, date: NaiveDate, scores: DomainScoreSet) -> Self {
        Self {
            user_id,
            week_start: week_start(date),
            average_score: round2(scores.mean()),
            scores,
        }
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
