//! Per-request deadline layered under the process lifetime token.
//!
//! A [`RequestDeadline`] fires when either the lifetime token is cancelled or
//! the request timeout elapses, whichever happens first. Only the request that
//! owns the deadline is affected by its timer; cancelling the lifetime token
//! interrupts every request at once.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The lifetime token was cancelled.
    Cancelled,
    /// The request timeout elapsed.
    TimedOut,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Cancelled => write!(f, "cancelled"),
            Interrupt::TimedOut => write!(f, "deadline exceeded"),
        }
    }
}

/// Deadline for a single fetch.
#[derive(Debug, Clone)]
pub struct RequestDeadline {
    lifetime: CancellationToken,
    timeout: Duration,
    expires_at: Instant,
}

impl RequestDeadline {
    /// Start a deadline that expires `timeout` from now or when `lifetime` is cancelled.
    pub fn new(lifetime: &CancellationToken, timeout: Duration) -> Self {
        Self {
            lifetime: lifetime.clone(),
            timeout,
            expires_at: Instant::now() + timeout,
        }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Non-blocking check; returns the reason if the deadline already fired.
    ///
    /// Cancellation takes precedence over expiry.
    pub fn check(&self) -> Option<Interrupt> {
        if self.lifetime.is_cancelled() {
            Some(Interrupt::Cancelled)
        } else if Instant::now() >= self.expires_at {
            Some(Interrupt::TimedOut)
        } else {
            None
        }
    }

    /// Resolves once the deadline fires.
    pub async fn fired(&self) -> Interrupt {
        tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => Interrupt::Cancelled,
            _ = sleep_until(self.expires_at) => Interrupt::TimedOut,
        }
    }

    /// Run `future` to completion unless the deadline fires first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, Interrupt> {
        if let Some(reason) = self.check() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.fired() => Err(reason),
            output = future => Ok(output),
        }
    }
}
