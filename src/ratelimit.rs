//! Sliding-window rate limiting per operation class.
//!
//! Summary and question requests are counted separately. A request is
//! admitted if fewer than `max_requests` were admitted in the trailing
//! window; rejected requests are not recorded.

use crate::cache::Operation;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Admission limit for one operation class. `max_requests == 0` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0, Duration::from_secs(60))
    }
}

/// Rejection returned when a class is over its limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    pub operation: Operation,
    pub limit: RateLimit,
    /// Time until the oldest admitted request leaves the window.
    pub retry_after: Duration,
}

impl std::fmt::Display for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} requests allowed per {}s for {} requests, retry in {}s",
            self.limit.max_requests,
            self.limit.window.as_secs(),
            self.operation,
            self.retry_after.as_secs().max(1)
        )
    }
}

struct Window {
    limit: RateLimit,
    admitted: Mutex<VecDeque<Instant>>,
}

impl Window {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    fn try_admit(&self, now: Instant) -> std::result::Result<(), Duration> {
        if self.limit.max_requests == 0 {
            return Ok(());
        }

        let mut admitted = self.admitted.lock().unwrap_or_else(|e| e.into_inner());
        while let Some(&oldest) = admitted.front() {
            if now.duration_since(oldest) >= self.limit.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        if admitted.len() < self.limit.max_requests as usize {
            admitted.push_back(now);
            return Ok(());
        }

        let retry_after = admitted
            .front()
            .map(|&oldest| self.limit.window.saturating_sub(now.duration_since(oldest)))
            .unwrap_or_default();
        Err(retry_after)
    }
}

/// Thread-safe limiter holding one window per operation class.
pub struct RateLimiter {
    summary: Window,
    question: Window,
}

impl RateLimiter {
    pub fn new(summary: RateLimit, question: RateLimit) -> Self {
        Self {
            summary: Window::new(summary),
            question: Window::new(question),
        }
    }

    /// A limiter that admits everything.
    pub fn unlimited() -> Self {
        Self::new(RateLimit::unlimited(), RateLimit::unlimited())
    }

    fn window(&self, operation: Operation) -> &Window {
        match operation {
            Operation::Summarize => &self.summary,
            Operation::Answer => &self.question,
        }
    }

    /// Admit a request of the given class, or explain why not.
    pub fn check(&self, operation: Operation) -> std::result::Result<(), Throttle> {
        let window = self.window(operation);
        window
            .try_admit(Instant::now())
            .map_err(|retry_after| Throttle {
                operation,
                limit: window.limit,
                retry_after,
            })
    }
}
