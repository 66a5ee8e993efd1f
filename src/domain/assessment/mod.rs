//! Assessment module - Scoring and measurement.
//!
//! Converts raw per-domain questionnaire scores into the composite index,
//! tier buckets, and baseline-relative deltas.

mod delta;
mod index;
mod scores;

pub use delta::{week_start, ScoreDelta, WeeklyDelta};
pub use index::{CompositeIndex, IndexTier};
pub use scores::{BaselineRecord, DomainScoreSet, ScoreDomain};
