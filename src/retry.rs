use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{DownloadError, SessionError};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for SessionError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Trigger(_) | SessionError::PageMissing(_) | SessionError::TabNotFound(_)
        )
    }
}

impl Retryable for DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::LinkNotFound | DownloadError::Timeout { .. } => true,
            DownloadError::Move { .. } | DownloadError::Stale { .. } => false,
            DownloadError::Session(e) => e.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^(attempt - 1)` after each failed attempt.
    Exponential { base: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        }
    }

    /// Call after attempt `attempt` failed with `err`. Sleeps and returns
    /// `true` when another attempt is allowed.
    pub async fn pause<E>(&self, label: &str, attempt: u32, err: &E) -> bool
    where
        E: Retryable + std::fmt::Display,
    {
        if !err.is_retryable() || attempt >= self.max_attempts {
            return false;
        }
        let delay = self.delay_after(attempt);
        warn!(
            "{} failed (attempt {}/{}): {}; retrying in {:.1}s",
            label,
            attempt,
            self.max_attempts,
            err,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
        true
    }

    /// Run `op` until it succeeds, fails terminally or the attempts run out.
    ///
    /// `ctx` is handed to each attempt and handed back with its result, so an
    /// attempt can hold `&mut` state (a portal session) across its awaits.
    pub async fn run<C, T, E, F, Fut>(&self, label: &str, mut ctx: C, mut op: F) -> Result<T, E>
    where
        F: FnMut(C, u32) -> Fut,
        Fut: Future<Output = (C, Result<T, E>)>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            let (back, result) = op(ctx, attempt).await;
            ctx = back;
            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !self.pause(label, attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }
}

// ── Tests ──
