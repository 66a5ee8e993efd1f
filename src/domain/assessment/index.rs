//! Composite wellbeing index and tier buckets.
//!
//! The Index collapses the four domain scores into a single 0-100 integer
//! that users see on their dashboard, bucketed into five named tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scores::DomainScoreSet;
use crate::domain::foundation::ValidationError;

/// Composite 0-100 index derived from four domain scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeIndex(u8);

impl CompositeIndex {
    /// Aggregates a validated score set: round(mean * 20).
    ///
    /// Revalidates the scores so a hand-built set cannot smuggle an
    /// out-of-range value past the boundary.
    pub fn from_scores(scores: &DomainScoreSet) -> Result<Self, ValidationError> {
        scores.validate()?;
        Ok(Self((scores.mean() * 20.0).round() as u8))
    }

    /// Returns the index value in [0, 100].
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns the tier bucket this index falls into.
    pub fn tier(&self) -> IndexTier {
        IndexTier::for_index(self.0)
    }
}

impl fmt::Display for CompositeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named bucket of the composite index.
///
/// The five buckets are contiguous and non-overlapping over [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTier {
    /// 0-20: running on empty.
    Depleted,
    /// 21-40: getting through the day, little reserve.
    BaselineMode,
    /// 41-60: foundations forming.
    Building,
    /// 61-80: regular access to focused, settled states.
    FlowState,
    /// 81-100: practices woven into daily life.
    Integrated,
}

impl IndexTier {
    /// Selects the bucket for an index value.
    pub fn for_index(index: u8) -> Self {
        match index {
            0..=20 => IndexTier::Depleted,
            21..=40 => IndexTier::BaselineMode,
            41..=60 => IndexTier::Building,
            61..=80 => IndexTier::FlowState,
            _ => IndexTier::Integrated,
        }
    }

    /// Display name shown to users.
    pub fn name(&self) -> &'static str {
        match self {
            IndexTier::Depleted => "Depleted",
            IndexTier::BaselineMode => "Baseline Mode",
            IndexTier::Building => "Building",
            IndexTier::FlowState => "Flow State",
            IndexTier::Integrated => "Integrated",
        }
    }

    /// Short description for dashboard rendering.
    pub fn description(&self) -> &'static str {
        match self {
            IndexTier::Depleted => "Reserves are low. Focus on rest and the stage-one practices.",
            IndexTier::BaselineMode => {
                "You're functioning but running near empty. Consistency matters most right now."
            }
            IndexTier::Building => "Foundations are taking hold. Keep the daily practices going.",
            IndexTier::FlowState => {
                "You're reaching settled, focused states regularly. Deepen what works."
            }
            IndexTier::Integrated => "The practices are part of how you live. Maintain and refine.",
        }
    }
}

impl fmt::Display for IndexTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
