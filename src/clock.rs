//! Injectable time source for renewal and expiry checks.
//!
//! Policy chains never read the system clock directly; they hold a `Clock`
//! so that tests can pin or advance time deterministically.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

/// A source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
///
/// Defaults to the zero time `0001-01-01 00:00:00 UTC`, the value an unset
/// `metav1.Time` renders as in status messages.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(zero_time())
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The proleptic-Gregorian zero time, `0001-01-01 00:00:00 UTC`.
pub fn zero_time() -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("year-one midnight is a valid timestamp");
    Utc.from_utc_datetime(&naive)
}

/// Render a timestamp the way `metav1.Time` values print in controller
/// status messages: `YYYY-MM-DD HH:MM:SS[.fffffffff] +0000 UTC`, with the
/// fractional part present only when non-zero and trailing zeros trimmed.
///
/// Violation messages embed these strings, and downstream status handling
/// assumes they are byte-stable, so do not change this format.
pub fn time_string(t: &DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = t.timestamp_subsec_nanos();
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}
