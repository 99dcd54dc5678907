//! Per-user rate limiting for the chat endpoint.
//!
//! Simplified sliding window counters: track request counts for the
//! current minute and hour windows, reset a counter when its window
//! expires, then increment and compare against the limits. State is
//! in-memory only and resets on process restart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::config::RateLimitConfig;

const MINUTE_SECS: u64 = 60;
const HOUR_SECS: u64 = 3600;

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        remaining_minute: u32,
        remaining_hour: u32,
    },
    /// Request is rate limited.
    Limited {
        /// When the exceeded window resets.
        retry_after: Duration,
        limit_type: LimitType,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Which rate limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitType {
    PerMinute,
    PerHour,
}

impl std::fmt::Display for LimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitType::PerMinute => write!(f, "per-minute"),
            LimitType::PerHour => write!(f, "per-hour"),
        }
    }
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

impl WindowState {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            count: 0,
        }
    }

    fn maybe_reset(&mut self, window_duration: Duration) {
        if self.window_start.elapsed() >= window_duration {
            self.window_start = Instant::now();
            self.count = 0;
        }
    }

    fn time_until_reset(&self, window_duration: Duration) -> Duration {
        let elapsed = self.window_start.elapsed();
        if elapsed >= window_duration {
            Duration::ZERO
        } else {
            window_duration - elapsed
        }
    }
}

#[derive(Debug)]
struct UserState {
    minute_window: WindowState,
    hour_window: WindowState,
}

impl UserState {
    fn new() -> Self {
        Self {
            minute_window: WindowState::new(),
            hour_window: WindowState::new(),
        }
    }
}

/// In-memory per-user rate limiter, shared via the router state.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: RwLock<HashMap<String, UserState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Check if a request is allowed and record it if so.
    pub async fn check_and_record(&self, user_id: &str) -> RateLimitResult {
        let mut state = self.state.write().await;
        let user_state = state
            .entry(user_id.to_string())
            .or_insert_with(UserState::new);

        user_state
            .minute_window
            .maybe_reset(Duration::from_secs(MINUTE_SECS));
        user_state
            .hour_window
            .maybe_reset(Duration::from_secs(HOUR_SECS));

        if user_state.minute_window.count >= self.config.requests_per_minute {
            return RateLimitResult::Limited {
                retry_after: user_state
                    .minute_window
                    .time_until_reset(Duration::from_secs(MINUTE_SECS)),
                limit_type: LimitType::PerMinute,
            };
        }

        if user_state.hour_window.count >= self.config.requests_per_hour {
            return RateLimitResult::Limited {
                retry_after: user_state
                    .hour_window
                    .time_until_reset(Duration::from_secs(HOUR_SECS)),
                limit_type: LimitType::PerHour,
            };
        }

        user_state.minute_window.count += 1;
        user_state.hour_window.count += 1;

        RateLimitResult::Allowed {
            remaining_minute: self.config.requests_per_minute - user_state.minute_window.count,
            remaining_hour: self.config.requests_per_hour - user_state.hour_window.count,
        }
    }
}
