// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Admission control for outbound chat requests
//!
//! The chat service accepts a fixed number of requests per second per
//! account, whoever sends them. `IntervalRateLimiter` admits one caller at a
//! time and releases the slot a fixed interval after admission, independent
//! of how long the admitted request runs or whether it is abandoned.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Interval of the process-wide limiter
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Grants the right to issue one outbound request
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a slot is available and take it
    async fn acquire_slot(&self);
}

/// One admission per `interval`, measured from each admission
pub struct IntervalRateLimiter {
    slot: Arc<Semaphore>,
    interval: Duration,
    admitted: AtomicU64,
}

impl IntervalRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            interval,
            admitted: AtomicU64::new(0),
        }
    }

    /// The process-wide limiter shared by every client that is not given
    /// its own
    pub fn shared() -> Arc<IntervalRateLimiter> {
        static SHARED: OnceLock<Arc<IntervalRateLimiter>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(IntervalRateLimiter::new(DEFAULT_INTERVAL))))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total admissions so far
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RateLimiter for IntervalRateLimiter {
    async fn acquire_slot(&self) {
        // Waiters queue in FIFO order inside the semaphore
        let permit = match Arc::clone(&self.slot).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!("Rate limiter semaphore closed, admitting without a slot");
                return;
            }
        };
        let count = self.admitted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(admitted = count, "Request admitted");

        let interval = self.interval;
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            drop(permit);
        });
    }
}

/// Admits every caller immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire_slot(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_admissions_are_spaced_by_interval() {
        let limiter = Arc::new(IntervalRateLimiter::new(Duration::from_secs(1)));
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire_slot().await;
                    Instant::now()
                })
            })
            .collect();

        let mut admitted_at = Vec::new();
        for handle in handles {
            admitted_at.push(handle.await.unwrap());
        }
        admitted_at.sort();

        for pair in admitted_at.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        assert_eq!(limiter.admitted(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_is_anchored_to_admission() {
        let limiter = IntervalRateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire_slot().await;
        // The admitted request "runs" for much longer than the interval
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let before_second = Instant::now();
        limiter.acquire_slot().await;
        assert_eq!(Instant::now(), before_second);
        assert!(before_second - start >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_caller_waits_for_interval() {
        let limiter = IntervalRateLimiter::new(Duration::from_millis(300));
        let start = Instant::now();
        limiter.acquire_slot().await;
        limiter.acquire_slot().await;
        assert!(Instant::now() - start >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = Unlimited;
        let start = std::time::Instant::now();
        for _ in 0..100 {
            limiter.acquire_slot().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_shared_is_one_instance() {
        let a = IntervalRateLimiter::shared();
        let b = IntervalRateLimiter::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.interval(), DEFAULT_INTERVAL);
    }
}
