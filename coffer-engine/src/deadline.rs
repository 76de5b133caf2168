//! Request deadlines
//!
//! Every pipeline operation carries an optional deadline. Stages check it
//! before starting, and collaborator I/O is raced against the remaining
//! budget; once expired the pipeline makes no further collaborator calls.

use coffer_core::error::{CofferError, Result};
use std::future::Future;
use std::time::{Duration, Instant};

/// Caller-provided deadline for one pipeline operation
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; the operation may run indefinitely
    pub fn none() -> Self {
        Self(None)
    }

    /// Deadline a fixed duration from now
    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    /// Deadline at a fixed instant
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// True once the deadline has passed
    pub fn is_expired(&self) -> bool {
        matches!(self.0, Some(at) if Instant::now() >= at)
    }

    /// Budget left, or `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Fail with `Cancelled` if the deadline has passed.
    pub(crate) fn check(&self, stage: &'static str) -> Result<()> {
        if self.is_expired() {
            return Err(CofferError::Cancelled { stage });
        }
        Ok(())
    }

    /// Run a future, bounding it by the remaining budget.
    pub(crate) async fn bound<F, T>(&self, stage: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        match self.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, fut)
                .await
                .map_err(|_| CofferError::Cancelled { stage }),
            None => Ok(fut.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deadline_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().is_none());
        assert!(deadline.check("stage").is_ok());
    }

    #[test]
    fn test_elapsed_deadline_expires() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.is_expired());
        assert!(matches!(
            deadline.check("compress"),
            Err(CofferError::Cancelled { stage: "compress" })
        ));
    }

    #[tokio::test]
    async fn test_bound_cancels_slow_future() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let result = deadline
            .bound("gather", tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(matches!(
            result,
            Err(CofferError::Cancelled { stage: "gather" })
        ));
    }

    #[tokio::test]
    async fn test_bound_passes_fast_future() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline.bound("gather", async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }
}
