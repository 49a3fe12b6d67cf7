//! Job-wide concurrency limiting
//!
//! The [`ConcurrencyLimiter`] bounds how many chapter fetches are in flight at
//! once across every book of a job. It wraps a tokio [`Semaphore`]; a
//! [`ConcurrencyPermit`] returns its slot when dropped, so a slot is released on
//! every exit path of an attempt: success, error, timeout, panic, or task abort.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, FetchError, Result};

/// Concurrency budget shared by every work-item of one job
///
/// Cloning is cheap and every clone shares the same budget.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    /// Slots available for new fetches
    semaphore: Arc<Semaphore>,
    /// Configured bound
    max_permits: usize,
    /// Highest number of simultaneously held permits seen so far
    peak: Arc<AtomicUsize>,
}

/// One unit of concurrency budget; the slot is returned when this is dropped
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the slot"]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max_permits` simultaneous fetches
    ///
    /// # Examples
    ///
    /// ```
    /// use scripture_dl::limiter::ConcurrencyLimiter;
    ///
    /// let limiter = ConcurrencyLimiter::new(5).unwrap();
    /// assert_eq!(limiter.available(), 5);
    ///
    /// assert!(ConcurrencyLimiter::new(0).is_err());
    /// ```
    pub fn new(max_permits: usize) -> Result<Self> {
        if max_permits == 0 {
            return Err(Error::config(
                "max_concurrent_requests",
                "max_concurrent_requests must be at least 1",
            ));
        }
        if max_permits > Semaphore::MAX_PERMITS {
            return Err(Error::config(
                "max_concurrent_requests",
                format!(
                    "max_concurrent_requests must not exceed {}",
                    Semaphore::MAX_PERMITS
                ),
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            peak: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Wait for a free slot.
    ///
    /// Fails with a `Cancelled` error only once the limiter has been [closed](Self::close).
    pub async fn acquire(&self) -> std::result::Result<ConcurrencyPermit, FetchError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::cancelled())?;

        self.peak.fetch_max(self.in_flight(), Ordering::Relaxed);
        Ok(ConcurrencyPermit { _permit: permit })
    }

    /// Return a slot. Equivalent to dropping the permit.
    pub fn release(&self, permit: ConcurrencyPermit) {
        drop(permit);
    }

    /// Wake every waiter with an error and refuse new acquisitions.
    ///
    /// Permits already handed out stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Configured bound
    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.max_permits.saturating_sub(self.available())
    }

    /// Highest number of slots held at the same time since creation
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_and_release_updates_counts() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();

        let a = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 1);
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);
        assert_eq!(limiter.available(), 0);

        limiter.release(a);
        assert_eq!(limiter.available(), 1);
        drop(b);
        assert_eq!(limiter.available(), 2);
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_free_slot() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second acquire must wait");

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after release")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_wakes_waiters_with_cancelled() {
        let limiter = ConcurrencyLimiter::new(1).unwrap();
        let _held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;

        limiter.close();
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err.kind, crate::error::FetchErrorKind::Cancelled);
        assert!(limiter.is_closed());
    }

    #[tokio::test]
    async fn test_aborted_task_returns_its_permit() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();

        let task = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
        };
        while limiter.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert_eq!(limiter.available(), 3, "abort must not leak the permit");
    }

    #[test]
    fn test_zero_bound_rejected() {
        assert!(matches!(
            ConcurrencyLimiter::new(0),
            Err(Error::Config { .. })
        ));
    }
}
