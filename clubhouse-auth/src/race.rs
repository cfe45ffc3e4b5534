//! TimeoutRace — settle with whichever of {operation, deadline} finishes first
//!
//! None of these helpers can fail. Failures inside the operation are the
//! caller's concern: either convert them to values beforehand, or use
//! [`race_ok`] which maps `Err` to the fallback.
//!
//! The deadline is a `tokio::time::Sleep` owned by the race future, so it is
//! dropped (and deregistered from the timer wheel) as soon as either side
//! settles.

use std::future::Future;
use std::time::Duration;

/// Bound on the initial `current_session()` probe
pub const SESSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Last-resort deadline after which `loading` is forced to `false`
pub const LOADING_WATCHDOG: Duration = Duration::from_secs(8);

/// Bound on a single Profile Directory role lookup
pub const ROLE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How a race settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    /// The operation produced its value before the deadline
    Completed(T),
    /// The deadline elapsed first; carries the fallback
    TimedOut(T),
}

impl<T> Settled<T> {
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Completed(v) | Self::TimedOut(v) => v,
        }
    }
}

/// Race `operation` against `deadline`, reporting which side won
pub async fn race_settled<F, T>(operation: F, deadline: Duration, fallback: T) -> Settled<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(value) => Settled::Completed(value),
        Err(_elapsed) => Settled::TimedOut(fallback),
    }
}

/// Race `operation` against `deadline`; the fallback wins on timeout
pub async fn race<F, T>(operation: F, deadline: Duration, fallback: T) -> T
where
    F: Future<Output = T>,
{
    race_settled(operation, deadline, fallback).await.into_inner()
}

/// Like [`race`], with error-to-fallback translation for fallible operations
pub async fn race_ok<F, T, E>(operation: F, deadline: Duration, fallback: T) -> T
where
    F: Future<Output = std::result::Result<T, E>>,
    T: Clone,
{
    match race_settled(operation, deadline, Ok(fallback.clone())).await.into_inner() {
        Ok(value) => value,
        Err(_) => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_operation_wins() {
        let out = race_settled(async { 7 }, Duration::from_millis(10), 0).await;
        assert_eq!(out, Settled::Completed(7));
        assert!(!out.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_wins() {
        let out = race_settled(std::future::pending::<u8>(), Duration::from_secs(5), 1).await;
        assert_eq!(out, Settled::TimedOut(1));
        assert_eq!(out.into_inner(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_becomes_fallback() {
        let failing = async { Err::<u32, &str>("directory offline") };
        assert_eq!(race_ok(failing, Duration::from_secs(1), 42).await, 42);
    }

    #[test]
    fn test_deadline_ordering() {
        assert!(SESSION_PROBE_TIMEOUT < LOADING_WATCHDOG);
        assert!(LOADING_WATCHDOG < ROLE_LOOKUP_TIMEOUT);
    }
}
