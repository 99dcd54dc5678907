//! Retry policy shared by LLM transports.

use std::time::Duration;

/// Whether an HTTP status is worth retrying.
///
/// 408 (timeout), 429 (rate limit) and all 5xx responses are transient;
/// everything else reflects the request itself and will not improve on
/// a retry.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Exponential backoff for the given zero-based attempt, capped at 10s.
pub(crate) fn retry_backoff_delay(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt).min(10);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(retry_backoff_delay(0), Duration::from_secs(1));
        assert_eq!(retry_backoff_delay(1), Duration::from_secs(2));
        assert_eq!(retry_backoff_delay(2), Duration::from_secs(4));
        assert_eq!(retry_backoff_delay(5), Duration::from_secs(10));
    }
}
