//! Countdown task for timed sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use quiz_core::Clock;
use quiz_core::deadline::remaining;

/// Default re-evaluation period for the countdown.
pub const TICK_PERIOD: StdDuration = StdDuration::from_secs(1);

/// Periodic countdown toward a fixed deadline.
///
/// The spawned task reports the clamped remaining time on every tick and
/// runs the expiry action exactly once when the deadline passes, then stops.
/// Once expired the clock never re-arms. Cancelling (or dropping) the handle
/// tears the task down without firing.
pub struct DeadlineClock {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl DeadlineClock {
    /// Spawns the countdown on the current tokio runtime.
    ///
    /// `on_tick` receives the remaining time, never negative; the final tick
    /// reports exactly zero before `on_expire` runs. Reading time through
    /// [`Clock`] lets tests pin "now" with a fixed clock.
    pub fn start<T, E>(
        deadline: DateTime<Utc>,
        clock: Clock,
        period: StdDuration,
        on_tick: T,
        on_expire: E,
    ) -> Self
    where
        T: Fn(Duration) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let task_fired = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            let mut on_expire = Some(on_expire);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // the first tick completes immediately
                interval.tick().await;
                let left = remaining(deadline, clock.now());
                if left.is_zero() {
                    on_tick(Duration::zero());
                    if !task_fired.swap(true, Ordering::SeqCst)
                        && let Some(expire) = on_expire.take()
                    {
                        expire();
                    }
                    break;
                }
                on_tick(left);
            }
        });
        Self { handle, fired }
    }

    /// True once the expiry action has run (or is running).
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// True once the countdown task has stopped, by expiry or cancellation.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the countdown without firing. Safe to call repeatedly; a clock
    /// that already expired is unaffected.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for DeadlineClock {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn short(ms: i64) -> DateTime<Utc> {
        Utc::now() + Duration::milliseconds(ms)
    }

    #[tokio::test]
    async fn expiry_action_runs_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let clock = DeadlineClock::start(
            short(30),
            Clock::default(),
            StdDuration::from_millis(5),
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(StdDuration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(clock.has_fired());
        assert!(clock.is_finished());
    }

    #[tokio::test]
    async fn past_deadline_fires_on_first_tick() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let clock = DeadlineClock::start(
            Utc::now() - Duration::seconds(5),
            Clock::default(),
            StdDuration::from_millis(5),
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(clock.has_fired());
    }

    #[tokio::test]
    async fn cancel_prevents_the_expiry_action() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let clock = DeadlineClock::start(
            short(50),
            Clock::default(),
            StdDuration::from_millis(5),
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        clock.cancel();
        tokio::time::sleep(StdDuration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!clock.has_fired());
        assert!(clock.is_finished());
    }

    #[tokio::test]
    async fn ticks_never_increase_and_end_at_zero() {
        let ticks: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let _clock = DeadlineClock::start(
            short(60),
            Clock::default(),
            StdDuration::from_millis(10),
            move |left| sink.lock().unwrap().push(left),
            || {},
        );

        tokio::time::sleep(StdDuration::from_millis(200)).await;
        let seen = ticks.lock().unwrap();
        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert_eq!(*seen.last().unwrap(), Duration::zero());
    }
}
