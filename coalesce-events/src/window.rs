//! Batch-window state machine.
//!
//! ```text
//! CLOSED --publish--------------------> OPEN   (timer armed)
//! OPEN   --publish, age <= cap--------> OPEN   (timer re-armed)
//! OPEN   --publish, age >  cap--------> CLOSED (flush now)
//! OPEN   --timer fired----------------> CLOSED (flush)
//! ```
//!
//! The window start is a hard cap measured from the first publish; the timer
//! is a trailing flush re-armed on every publish.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What the caller must do after a publish was recorded.
#[derive(Debug)]
pub(crate) enum WindowAction {
    /// Trigger a round now.
    Flush,
    /// Spawn a timer for `delay`; when it fires call
    /// [`BatchWindow::on_timer_fired`] with `epoch`.
    Arm {
        epoch: u64,
        delay: Duration,
        cancel: CancellationToken,
    },
}

#[derive(Debug)]
struct ArmedTimer {
    epoch: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct BatchWindow {
    max_batch_time: Duration,
    started_at: Option<Instant>,
    timer: Option<ArmedTimer>,
    epoch: u64,
}

impl BatchWindow {
    pub(crate) fn new(max_batch_time: Duration) -> Self {
        Self {
            max_batch_time,
            started_at: None,
            timer: None,
            epoch: 0,
        }
    }

    pub(crate) fn max_batch_time(&self) -> Duration {
        self.max_batch_time
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.started_at.is_some()
    }

    #[cfg(test)]
    pub(crate) fn has_armed_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Record a publish that enqueued work at `now`.
    pub(crate) fn on_publish(&mut self, now: Instant) -> WindowAction {
        let started_at = *self.started_at.get_or_insert(now);
        self.disarm();

        if self.exceeded(now.saturating_duration_since(started_at)) {
            self.started_at = None;
            return WindowAction::Flush;
        }

        self.epoch += 1;
        let cancel = CancellationToken::new();
        self.timer = Some(ArmedTimer {
            epoch: self.epoch,
            cancel: cancel.clone(),
        });
        WindowAction::Arm {
            epoch: self.epoch,
            delay: self.max_batch_time,
            cancel,
        }
    }

    /// A timer armed with `epoch` fired. Returns whether a round should run;
    /// a timer superseded by a later publish is ignored.
    pub(crate) fn on_timer_fired(&mut self, epoch: u64) -> bool {
        if !self.timer.as_ref().is_some_and(|t| t.epoch == epoch) {
            return false;
        }
        self.timer = None;
        self.started_at = None;
        true
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel.cancel();
        }
    }

    fn exceeded(&self, elapsed: Duration) -> bool {
        self.max_batch_time.is_zero() || elapsed > self.max_batch_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: Duration = Duration::from_millis(50);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn first_publish_opens_window_and_arms_timer() {
        let mut window = BatchWindow::new(CAP);
        let t0 = Instant::now();

        assert!(!window.is_open());
        let action = window.on_publish(t0);
        assert!(matches!(action, WindowAction::Arm { delay, .. } if delay == CAP));
        assert!(window.is_open());
        assert!(window.has_armed_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_previous_timer() {
        let mut window = BatchWindow::new(CAP);
        let t0 = Instant::now();

        let WindowAction::Arm { epoch: first, cancel: first_cancel, .. } = window.on_publish(t0)
        else {
            panic!("expected Arm");
        };
        let WindowAction::Arm { epoch: second, .. } = window.on_publish(t0 + ms(10)) else {
            panic!("expected Arm");
        };

        assert!(first_cancel.is_cancelled());
        assert!(!window.on_timer_fired(first), "stale timer must be ignored");
        assert!(window.is_open());
        assert!(window.on_timer_fired(second));
        assert!(!window.is_open());
        assert!(!window.has_armed_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn cap_is_measured_from_window_start() {
        let mut window = BatchWindow::new(CAP);
        let t0 = Instant::now();

        assert!(matches!(window.on_publish(t0), WindowAction::Arm { .. }));
        assert!(matches!(window.on_publish(t0 + ms(30)), WindowAction::Arm { .. }));
        // Exactly at the cap is still inside the window.
        assert!(matches!(window.on_publish(t0 + ms(50)), WindowAction::Arm { .. }));
        assert!(matches!(window.on_publish(t0 + ms(51)), WindowAction::Flush));
        assert!(!window.is_open());
        assert!(!window.has_armed_timer());

        // Next publish opens a fresh window.
        assert!(matches!(window.on_publish(t0 + ms(60)), WindowAction::Arm { .. }));
    }

    #[test]
    fn reports_configured_cap() {
        assert_eq!(BatchWindow::new(CAP).max_batch_time(), CAP);
        assert!(BatchWindow::new(Duration::ZERO).max_batch_time().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cap_flushes_every_publish() {
        let mut window = BatchWindow::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(matches!(window.on_publish(t0), WindowAction::Flush));
        assert!(matches!(window.on_publish(t0), WindowAction::Flush));
        assert!(!window.is_open());
    }
}
