use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Margin added on top of the advertised reset time.
pub const RESET_MARGIN: Duration = Duration::from_secs(2);
/// Waits at or above this are skipped; the next scheduled scan picks it up.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Quota state reported by the upstream API on every response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_num = |name: &str| -> Option<i64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };

        Self {
            remaining: header_num(REMAINING_HEADER).and_then(|n| u64::try_from(n).ok()),
            reset_at: header_num(RESET_HEADER).and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// How long to sleep before the quota comes back, if it is worth waiting.
    ///
    /// `None` unless the quota is exhausted and reset plus margin lies
    /// strictly between now and [`MAX_RATE_LIMIT_WAIT`] from now.
    pub fn backoff(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_exhausted() {
            return None;
        }
        let reset_at = self.reset_at?;
        let margin = chrono::Duration::from_std(RESET_MARGIN).ok()?;
        let wait = (reset_at - now + margin).to_std().ok()?;
        (!wait.is_zero() && wait < MAX_RATE_LIMIT_WAIT).then_some(wait)
    }
}
