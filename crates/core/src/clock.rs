use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn physical_now() -> Result<i64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .map_err(|_| CoreError::InvalidData("system clock before epoch".into()))
}

/// Milliseconds since Unix epoch, as stored in `created_at`, `decided_at`
/// and `updated_at` columns.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Strictly increasing millisecond clock. Two ticks never return the same
/// value, so rows stamped by one clock keep their submission order.
#[derive(Debug, Default)]
pub struct Clock {
    last_ms: i64,
}

impl Clock {
    pub fn new() -> Self {
        Self { last_ms: 0 }
    }

    pub fn tick(&mut self) -> Result<Timestamp, CoreError> {
        let now = physical_now()?;
        self.last_ms = if now > self.last_ms { now } else { self.last_ms + 1 };
        Ok(Timestamp(self.last_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_monotonicity() {
        let mut clock = Clock::new();
        let mut prev = clock.tick().unwrap();
        for _ in 0..100 {
            let next = clock.tick().unwrap();
            assert!(next > prev, "expected {next:?} > {prev:?}");
            prev = next;
        }
    }

    #[test]
    fn clock_ahead_of_wall_time_still_advances() {
        let mut clock = Clock::new();
        let future_ms = physical_now().unwrap() + 100_000;
        clock.last_ms = future_ms;

        assert_eq!(clock.tick().unwrap().as_millis(), future_ms + 1);
        assert_eq!(clock.tick().unwrap().as_millis(), future_ms + 2);
    }

    #[test]
    fn display_is_utc() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        assert_eq!(ts.to_string(), "2023-11-14 22:13:20.000 UTC");
    }
}
