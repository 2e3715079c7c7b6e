use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Time source used to measure the age of a batch window.
///
/// The flush timer itself always runs on Tokio time; only window-age
/// measurement goes through the clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Reads `tokio::time::Instant::now()`, so it follows paused test time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// ```ignore
/// let clock = Arc::new(ManualClock::new());
/// let bus: EventBus = EventBus::builder().clock(clock.clone()).build();
/// clock.advance(Duration::from_millis(60));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    /// Set the elapsed time since creation.
    pub fn set_elapsed(&self, elapsed: Duration) {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner) = elapsed;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
