//! Curriculum stage value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// One of the seven ordered curriculum stages.
///
/// Stage 1 is where every user starts; stage 7 is terminal and only
/// reachable through manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(u8);

impl Stage {
    /// The entry stage.
    pub const FIRST: Self = Self(1);

    /// The terminal stage.
    pub const FINAL: Self = Self(7);

    /// Creates a stage, returning error if outside [1, 7].
    pub fn try_new(value: u8) -> Result<Self, ValidationError> {
        if !(1..=7).contains(&value) {
            return Err(ValidationError::out_of_range(
                "stage",
                1.0,
                7.0,
                f64::from(value),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the stage number in [1, 7].
    pub fn value(&self) -> u8 {
        self.0
    }

    /// The next stage up, or None at the terminal stage.
    pub fn next(&self) -> Option<Stage> {
        if self.0 < 7 {
            Some(Stage(self.0 + 1))
        } else {
            None
        }
    }

    /// True for the terminal stage.
    pub fn is_terminal(&self) -> bool {
        self.0 == 7
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
