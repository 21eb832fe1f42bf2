//! Scan configuration
//!
//! Times are handled as UTC `chrono` values. The scan window is half-open:
//! `[start, start + time_range)`.

use chrono::{DateTime, Duration, Utc};

use crate::errors::{Result, ScanError};

/// Default scan window in minutes
pub const DEFAULT_TIME_RANGE_MINUTES: u32 = 60;

/// X-Ray retains traces for 30 days
const MAX_START_AGE_DAYS: i64 = 30;

/// Tolerated clock skew for start times in the future
const MAX_START_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Start of the scan window. When absent the window ends now.
    pub start_time: Option<DateTime<Utc>>,
    pub time_range_minutes: u32,
    /// X-Ray filter expression passed to `GetTraceSummaries`
    pub filter_expression: Option<String>,
    /// Compare generated policies with the policies of each function's execution role
    pub compare_existing_role: bool,
    /// Region for calls whose region can't be derived from the trace
    pub default_region: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            start_time: None,
            time_range_minutes: DEFAULT_TIME_RANGE_MINUTES,
            filter_expression: None,
            compare_existing_role: false,
            default_region: None,
        }
    }
}

/// A resolved time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScanConfig {
    /// Start time from a unix timestamp in seconds
    pub fn start_time_from_unix(seconds: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| ScanError::invalid_config(format!("Invalid start time [{seconds}]")))
    }

    /// Reject windows X-Ray can't serve
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.time_range_minutes == 0 {
            return Err(ScanError::invalid_config("Time range must be at least one minute"));
        }
        if let Some(start) = self.start_time {
            if start < now - Duration::days(MAX_START_AGE_DAYS)
                || start > now + Duration::seconds(MAX_START_SKEW_SECONDS)
            {
                return Err(ScanError::invalid_config(format!(
                    "Invalid start time [{}]. Start time can't be older than {} days or in the future.",
                    start.timestamp(),
                    MAX_START_AGE_DAYS
                )));
            }
        }
        Ok(())
    }

    /// The window to scan, relative to `now` when no start time is set
    pub fn window(&self, now: DateTime<Utc>) -> ScanWindow {
        let range = Duration::minutes(i64::from(self.time_range_minutes));
        let start = self.start_time.unwrap_or(now - range);
        ScanWindow {
            start,
            end: start + range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_default_window_ends_now() {
        let config = ScanConfig::default();
        let window = config.window(now());
        assert_eq!(window.end, now());
        assert_eq!(window.start, now() - Duration::minutes(60));
    }

    #[test]
    fn test_window_from_start_time() {
        let start = now() - Duration::hours(5);
        let config = ScanConfig {
            start_time: Some(start),
            time_range_minutes: 15,
            ..ScanConfig::default()
        };
        let window = config.window(now());
        assert_eq!(window.start, start);
        assert_eq!(window.end, start + Duration::minutes(15));
    }

    #[rstest]
    #[case(Duration::days(29), true)]
    #[case(Duration::days(31), false)]
    #[case(Duration::seconds(-30), true)]
    #[case(Duration::seconds(-120), false)]
    fn test_start_time_bounds(#[case] age: Duration, #[case] valid: bool) {
        let config = ScanConfig {
            start_time: Some(now() - age),
            ..ScanConfig::default()
        };
        assert_eq!(config.validate(now()).is_ok(), valid);
    }

    #[test]
    fn test_zero_time_range_is_rejected() {
        let config = ScanConfig {
            time_range_minutes: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(
            config.validate(now()),
            Err(ScanError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_start_time_from_unix() {
        assert_eq!(ScanConfig::start_time_from_unix(1_700_000_000).unwrap(), now());
        assert!(ScanConfig::start_time_from_unix(i64::MAX).is_err());
    }
}
