//! # Clock
//! Time source shared by the cache, the history store and the energy provider.
//!
//! Production code uses [`SystemClock`]; tests drive a [`ManualClock`] so TTL
//! expiry and calendar-day rollover are deterministic.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, t: DateTime<Local>) {
        *self.now.lock().expect("clock mutex poisoned") = t;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Calendar-day key used by the history store, e.g. `19.10.2026`.
pub fn day_key(t: &DateTime<Local>) -> String {
    t.format("%-d.%-m.%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_key_has_no_zero_padding() {
        let t = Local.with_ymd_and_hms(2026, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(day_key(&t), "5.3.2026");
        let t = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert_eq!(day_key(&t), "19.10.2026");
    }

    #[test]
    fn manual_clock_advances() {
        let start = Local.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let c = ManualClock::new(start);
        c.advance(Duration::minutes(5));
        assert_eq!(c.now() - start, Duration::minutes(5));
    }
}
