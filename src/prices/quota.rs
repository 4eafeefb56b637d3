//! Daily ceiling on outbound price fetches.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_DAILY_QUOTA: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub day_key: NaiveDate,
    pub count: u32,
    pub ceiling: u32,
}

impl QuotaState {
    pub fn remaining(&self) -> u32 {
        self.ceiling.saturating_sub(self.count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.count >= self.ceiling
    }
}

/// Counts fetch attempts per calendar day.
///
/// The window is keyed by calendar date, not elapsed time: attempts at 23:59
/// and 00:01 land in different windows.
pub struct QuotaGuard {
    state: Mutex<QuotaState>,
    clock: Arc<dyn Clock>,
}

impl QuotaGuard {
    pub fn new(ceiling: u32) -> Self {
        Self::with_clock(ceiling, Arc::new(SystemClock))
    }

    pub fn with_clock(ceiling: u32, clock: Arc<dyn Clock>) -> Self {
        let state = QuotaState {
            day_key: clock.today(),
            count: 0,
            ceiling,
        };
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    /// Takes one unit of today's quota. Returns false, changing nothing,
    /// once the ceiling is reached.
    pub fn try_consume(&self) -> bool {
        let today = self.clock.today();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.day_key != today {
            state.day_key = today;
            state.count = 0;
        }
        if state.is_exhausted() {
            return false;
        }
        state.count += 1;
        true
    }

    /// Current state, rolled over to today if the day changed.
    pub fn state(&self) -> QuotaState {
        let today = self.clock.today();
        let state = *self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.day_key != today {
            QuotaState {
                day_key: today,
                count: 0,
                ceiling: state.ceiling,
            }
        } else {
            state
        }
    }
}

impl std::fmt::Debug for QuotaGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGuard")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn guard_at(ceiling: u32, h: u32, m: u32) -> (QuotaGuard, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap());
        let guard = QuotaGuard::with_clock(ceiling, Arc::new(clock.clone()));
        (guard, clock)
    }

    #[test]
    fn test_ceiling_reached() {
        let (guard, _clock) = guard_at(DEFAULT_DAILY_QUOTA, 9, 0);
        for _ in 0..DEFAULT_DAILY_QUOTA {
            assert!(guard.try_consume());
        }
        assert!(!guard.try_consume());
        assert_eq!(guard.state().count, DEFAULT_DAILY_QUOTA);
        assert_eq!(guard.state().remaining(), 0);
    }

    #[test]
    fn test_rejection_has_no_side_effects() {
        let (guard, _clock) = guard_at(1, 9, 0);
        assert!(guard.try_consume());
        assert!(!guard.try_consume());
        assert!(!guard.try_consume());
        assert_eq!(guard.state().count, 1);
    }

    #[test]
    fn test_resets_at_calendar_day_boundary() {
        let (guard, clock) = guard_at(2, 23, 59);
        assert!(guard.try_consume());
        assert!(guard.try_consume());
        assert!(!guard.try_consume());

        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(guard.state().count, 0);
        assert!(guard.try_consume());
        assert_eq!(guard.state().count, 1);
        assert_eq!(
            guard.state().day_key,
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
        );
    }

    #[test]
    fn test_same_day_never_decreases() {
        let (guard, clock) = guard_at(10, 0, 1);
        let mut last = 0;
        for _ in 0..5 {
            guard.try_consume();
            clock.advance(chrono::Duration::hours(4));
            let count = guard.state().count;
            assert!(count >= last);
            last = count;
        }
    }
}
