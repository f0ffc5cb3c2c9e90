//! Cancellable countdown used for task auto-submission and the router's
//! observation delay.
//!
//! The countdown runs on its own task and reports per-second ticks. It is
//! cancelled explicitly with [`Countdown::cancel`] or implicitly on drop,
//! so a countdown can never fire after its owner is gone.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_secs(1);

/// A running countdown.
pub struct Countdown {
    token: CancellationToken,
    fired: oneshot::Receiver<()>,
    done: Option<bool>,
    duration: Duration,
}

impl Countdown {
    /// Start counting down `duration`, calling `on_tick` with the whole
    /// seconds remaining at the start and after each tick.
    pub fn start<F>(duration: Duration, on_tick: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let token = CancellationToken::new();
        let (tx, fired) = oneshot::channel();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let deadline = Instant::now() + duration;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    if !cancelled.is_cancelled() {
                        tx.send(()).ok();
                    }
                    return;
                }
                let remaining = deadline - now;
                on_tick(whole_secs(remaining));
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = tokio::time::sleep(remaining.min(TICK)) => {}
                }
            }
        });

        Self {
            token,
            fired,
            done: None,
            duration,
        }
    }

    /// Countdown without tick reporting.
    pub fn silent(duration: Duration) -> Self {
        Self::start(duration, |_| {})
    }

    /// Resolve when the countdown ends: `true` if it ran out, `false` if it
    /// was cancelled. Once resolved, later calls return the same answer
    /// immediately.
    pub async fn expired(&mut self) -> bool {
        if let Some(done) = self.done {
            return done;
        }
        let fired = (&mut self.fired).await.is_ok();
        self.done = Some(fired);
        fired
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn whole_secs(remaining: Duration) -> u64 {
    let millis = remaining.as_millis();
    u64::try_from(millis.div_ceil(1000)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_countdown_expires() {
        let mut countdown = Countdown::silent(Duration::from_secs(3));
        let started = Instant::now();
        assert!(countdown.expired().await);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let mut countdown = Countdown::silent(Duration::from_secs(3));
        countdown.cancel();
        assert!(!countdown.expired().await);
        assert!(countdown.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_countdown_can_be_awaited_again() {
        let mut countdown = Countdown::silent(Duration::from_secs(2));
        assert!(countdown.expired().await);
        let resolved_at = Instant::now();
        assert!(countdown.expired().await);
        assert_eq!(Instant::now(), resolved_at);

        let mut cancelled = Countdown::silent(Duration::from_secs(2));
        cancelled.cancel();
        assert!(!cancelled.expired().await);
        assert!(!cancelled.expired().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_count_down_each_second() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&ticks);
        let mut countdown = Countdown::start(Duration::from_secs(3), move |s| {
            seen.lock().unwrap().push(s);
        });
        assert!(countdown.expired().await);
        assert_eq!(*ticks.lock().unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_background_task() {
        let ticks = Arc::new(Mutex::new(0u32));
        let seen = Arc::clone(&ticks);
        let countdown = Countdown::start(Duration::from_secs(10), move |_| {
            *seen.lock().unwrap() += 1;
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(countdown);
        let before = *ticks.lock().unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(*ticks.lock().unwrap(), before);
    }

    #[test]
    fn test_whole_secs_rounds_up() {
        assert_eq!(whole_secs(Duration::from_millis(2500)), 3);
        assert_eq!(whole_secs(Duration::from_secs(2)), 2);
        assert_eq!(whole_secs(Duration::from_millis(1)), 1);
    }
}
