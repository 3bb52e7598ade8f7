use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate};

/// Source of "now". Injected so midnight rollover is testable without
/// waiting for a real one.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A settable clock. Hold a second `Arc` handle to advance time under a
/// store that already owns it.
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon on `day`, so the normalized day is unambiguous across DST shifts.
    #[must_use]
    pub fn on_day(day: NaiveDate) -> Self {
        Self::new(crate::models::day_start_local(day) + chrono::Duration::hours(12))
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += chrono::Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
