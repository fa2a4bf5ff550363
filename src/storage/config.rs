//! Engine configuration.
//!
//! The windowed achievement predicates (weekend, early riser, night owl,
//! same day) are defined in the app's local time. The offset is explicit
//! configuration rather than ambient system time so computations are
//! deterministic under test.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Largest offset chrono accepts, just under one day either side of UTC.
const MAX_OFFSET_MINUTES: i32 = 23 * 60 + 59;

/// Configuration for the progress engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Local time offset from UTC, in minutes (positive = east of UTC).
    pub utc_offset_minutes: i32,
}

impl EngineConfig {
    /// Create a config with the given UTC offset in minutes.
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { utc_offset_minutes }
    }

    /// The configured offset as a chrono `FixedOffset`.
    pub fn offset(&self) -> FixedOffset {
        let minutes = self
            .utc_offset_minutes
            .clamp(-MAX_OFFSET_MINUTES, MAX_OFFSET_MINUTES);
        FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_default_is_utc() {
        let config = EngineConfig::default();
        assert_eq!(config.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_positive_offset_shifts_hour() {
        let config = EngineConfig::new(120); // UTC+2
        let utc = Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap();
        let local = utc.with_timezone(&config.offset());
        assert_eq!(local.hour(), 8);
    }

    #[test]
    fn test_out_of_range_offset_is_clamped() {
        let config = EngineConfig::new(100_000);
        assert_eq!(
            config.offset().local_minus_utc(),
            (23 * 60 + 59) * 60
        );
    }
}
