//! Clock abstraction for poll timing.
//!
//! The poller only needs "how long since I started" and "suspend for a
//! while". [`SystemClock`] delegates to tokio; [`FakeClock`] keeps virtual
//! time so poll timing can be asserted deterministically.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source and suspension point used by the poller
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Suspend the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a clock starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fake clock for deterministic testing
///
/// `sleep` returns immediately after advancing virtual time.
#[derive(Debug, Default)]
pub struct FakeClock {
    /// Current virtual time in milliseconds
    current_ms: AtomicU64,
    /// Every sleep requested, in order
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    /// Create a fake clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared fake clock
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advance time without recording a sleep (simulates slow work)
    pub fn advance(&self, duration: Duration) {
        self.current_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Current virtual time in milliseconds
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Sleeps requested so far
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of sleeps requested so far
    #[must_use]
    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms())
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_clock_sleep_advances_time() {
        let clock = FakeClock::new();
        clock.sleep(Duration::from_millis(100)).await;
        clock.sleep(Duration::from_millis(100)).await;
        assert_eq!(clock.now(), Duration::from_millis(200));
        assert_eq!(clock.sleep_count(), 2);
    }

    #[tokio::test]
    async fn test_fake_clock_advance_is_not_a_sleep() {
        let clock = FakeClock::new();
        clock.advance(Duration::from_millis(750));
        assert_eq!(clock.now_ms(), 750);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_shared_clock_delegates() {
        let clock = FakeClock::shared();
        let handle: Arc<FakeClock> = Arc::clone(&clock);
        handle.sleep(Duration::from_millis(40)).await;
        assert_eq!(Clock::now(&clock), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_system_clock_sleeps() {
        let clock = SystemClock::new();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() >= Duration::from_millis(5));
    }
}
