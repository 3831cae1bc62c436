//! Spaced repetition scheduling.

pub mod sm2;

use crate::error::Result;
use crate::types::{CardState, Quality};
use chrono::{DateTime, Utc};

pub use sm2::Sm2;

/// Result of scheduling a card after review.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingResult {
    pub new_state: CardState,
    pub next_due: DateTime<Utc>,
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate next review state after a review.
    ///
    /// Fails with `InvalidInput` if the next due date is not representable.
    fn schedule(
        &self,
        state: &CardState,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<SchedulingResult>;

    /// Initial state for a card created at `now`.
    fn initial_state(&self, now: DateTime<Utc>) -> CardState;
}

/// Get algorithm by name.
pub fn get_algorithm(name: &str) -> Option<Box<dyn SpacedRepetitionAlgorithm>> {
    match name {
        "sm2" => Some(Box::new(Sm2::default())),
        _ => None,
    }
}
