//! Time source and timestamp normalization.
//!
//! Every operation samples [`Clock::now`] once and threads that instant
//! through all derived timestamps. Stored and exchanged instants are UTC;
//! input without zone information is taken to be UTC.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    at: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at: RwLock::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.write() = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.write() += by;
    }

    fn write(&self) -> RwLockWriteGuard<'_, DateTime<Utc>> {
        self.at.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.read().unwrap_or_else(PoisonError::into_inner)
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 or naive ISO-8601 timestamp into UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// RFC 3339, microsecond precision, `Z` suffix. Lexical order equals time order.
pub fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whole minutes from `from` to `to`, floored (negative spans round down).
pub fn whole_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let span = to - from;
    match span.num_microseconds() {
        Some(micros) => micros.div_euclid(60_000_000),
        None => span.num_minutes(),
    }
}
