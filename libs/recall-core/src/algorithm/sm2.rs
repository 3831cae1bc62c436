//! SM-2 spaced repetition algorithm.
//!
//! Quality 0-2 is a lapse: the streak resets and the card comes back the
//! next day. Quality 3-5 extends the streak; intervals run 1 day, 6 days,
//! then the previous interval times the new ease factor. The ease factor
//! is adjusted on every review and never drops below the minimum.
//! Intervals are capped at `maximum_interval` days.

use super::{SchedulingResult, SpacedRepetitionAlgorithm};
use crate::error::{CoreError, Result};
use crate::types::{CardState, Quality};
use chrono::{DateTime, Duration, Utc};

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone)]
pub struct Sm2 {
    pub initial_ease: f64,
    pub minimum_ease: f64,
    pub first_interval: u32,
    pub second_interval: u32,
    pub lapse_interval: u32,
    pub maximum_interval: u32,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self {
            initial_ease: CardState::DEFAULT_EASE,
            minimum_ease: CardState::MINIMUM_EASE,
            first_interval: 1,
            second_interval: 6,
            lapse_interval: 1,
            maximum_interval: 36_500,
        }
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self, now: DateTime<Utc>) -> CardState {
        CardState {
            ease_factor: self.initial_ease,
            ..CardState::new(now)
        }
    }

    fn schedule(
        &self,
        state: &CardState,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<SchedulingResult> {
        let new_ease = self.next_ease(state.ease_factor, quality);

        let (streak, interval_days) = if quality.is_correct() {
            let streak = state.streak + 1;
            let interval = match streak {
                1 => self.first_interval,
                2 => self.second_interval,
                _ => (f64::from(state.interval_days) * new_ease).round() as u32,
            };
            (streak, interval)
        } else {
            (0, self.lapse_interval)
        };
        let interval_days = interval_days.min(self.maximum_interval);

        let next_due = now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("{now} + {interval_days} days is out of range"))
            })?;

        Ok(SchedulingResult {
            new_state: CardState {
                ease_factor: new_ease,
                interval_days,
                streak,
                review_count: state.review_count + 1,
                last_reviewed_at: Some(now),
                next_review_due_at: next_due,
            },
            next_due,
        })
    }
}

impl Sm2 {
    fn next_ease(&self, ease: f64, quality: Quality) -> f64 {
        let miss = f64::from(Quality::MAX - quality.value());
        (ease + (0.1 - miss * (0.08 + miss * 0.02))).max(self.minimum_ease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_perfect_review() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(now());
        let result = sm2.schedule(&state, q(5), now()).unwrap();
        assert_eq!(result.new_state.streak, 1);
        assert_eq!(result.new_state.interval_days, 1);
        assert_eq!(result.new_state.review_count, 1);
        assert_eq!(result.new_state.last_reviewed_at, Some(now()));
        assert_eq!(result.next_due, now() + Duration::days(1));
        assert!(approx(result.new_state.ease_factor, 2.6));
    }

    #[test]
    fn streak_intervals_follow_one_six_then_ease() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(now());
        let mut t = now();
        let mut intervals = Vec::new();
        for _ in 0..3 {
            let result = sm2.schedule(&state, q(5), t).unwrap();
            intervals.push(result.new_state.interval_days);
            t = result.next_due;
            state = result.new_state;
        }
        // Third interval uses the ease after the third review (2.8).
        assert_eq!(intervals, vec![1, 6, (6.0_f64 * 2.8).round() as u32]);
        assert_eq!(state.streak, 3);
    }

    #[test]
    fn lapse_resets_streak_and_interval() {
        let sm2 = Sm2::default();
        let state = CardState {
            ease_factor: 2.6,
            interval_days: 10,
            streak: 3,
            review_count: 3,
            last_reviewed_at: Some(now() - Duration::days(10)),
            next_review_due_at: now(),
        };
        let result = sm2.schedule(&state, q(1), now()).unwrap();
        assert_eq!(result.new_state.streak, 0);
        assert_eq!(result.new_state.interval_days, 1);
        assert!(result.new_state.ease_factor < 2.6);
        assert!(approx(result.new_state.ease_factor, 2.06));
    }

    #[test]
    fn every_failing_quality_resets() {
        let sm2 = Sm2::default();
        for value in 0..3 {
            let state = CardState {
                streak: 7,
                interval_days: 40,
                ..CardState::new(now())
            };
            let result = sm2.schedule(&state, q(value), now()).unwrap();
            assert_eq!(result.new_state.streak, 0);
            assert_eq!(result.new_state.interval_days, 1);
        }
    }

    #[test]
    fn quality_three_keeps_interval_growing_but_lowers_ease() {
        let sm2 = Sm2::default();
        let state = CardState {
            ease_factor: 2.5,
            interval_days: 6,
            streak: 2,
            ..CardState::new(now())
        };
        let result = sm2.schedule(&state, q(3), now()).unwrap();
        assert!(approx(result.new_state.ease_factor, 2.36));
        assert_eq!(result.new_state.interval_days, 14);
        assert_eq!(result.new_state.streak, 3);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(now());
        let mut t = now();
        for value in [0, 1, 2, 0, 0, 3, 0, 5, 0, 1, 0, 0] {
            let result = sm2.schedule(&state, q(value), t).unwrap();
            assert!(result.new_state.ease_factor >= sm2.minimum_ease);
            t = result.next_due;
            state = result.new_state;
        }
        assert!(approx(state.ease_factor, sm2.minimum_ease));
    }

    #[test]
    fn interval_is_capped_over_long_streaks() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(now());
        let mut t = now();
        for _ in 0..60 {
            let result = sm2.schedule(&state, q(5), t).unwrap();
            assert!(result.new_state.interval_days <= sm2.maximum_interval);
            t = result.next_due;
            state = result.new_state;
        }
        assert_eq!(state.interval_days, sm2.maximum_interval);
    }

    #[test]
    fn unrepresentable_due_date_is_an_error() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(now());
        let end_of_time = DateTime::<Utc>::MAX_UTC;
        let err = sm2.schedule(&state, q(5), end_of_time).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn due_date_matches_last_review_plus_interval() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(now());
        let result = sm2.schedule(&state, q(4), now()).unwrap();
        let reviewed = result.new_state.last_reviewed_at.unwrap();
        assert_eq!(
            result.new_state.next_review_due_at,
            reviewed + Duration::days(i64::from(result.new_state.interval_days))
        );
    }
}
