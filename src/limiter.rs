//! Rate limiting for outbound venue calls.
//!
//! Every adapter routes its external queries through one shared
//! [`RateLimiter`], so a sweep can fan out hundreds of quote requests while
//! the process as a whole stays inside the provider's call budget.

use std::future::Future;
use std::sync::{Arc, Mutex};

use eyre::{eyre, Result};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// A queued unit of work. Invoking it fires the underlying call on its own
/// task; the caller's result travels back over a oneshot channel.
type Job = Box<dyn FnOnce() + Send>;

/// Bounds how many outbound calls may start per fixed time window.
///
/// `schedule` enqueues eagerly and hands back a future that resolves with the
/// call's own outcome. A timer task drains the queue once per window,
/// starting at most the configured budget of calls per tick. Draining is
/// newest-first (LIFO): order only affects fairness between callers, never
/// correctness, and the newest quote is the one most likely to still be
/// wanted.
///
/// An unbounded limiter starts every call immediately and adds no delay.
///
/// Dropping the limiter stops the timer and abandons still-queued calls, and
/// their callers observe a disposal error. That is a shutdown path, not a
/// runtime condition to recover from.
pub struct RateLimiter {
    /// Queue plus drain task; `None` means unbounded.
    bounded: Option<Bounded>,
}

/// State backing a bounded limiter.
struct Bounded {
    /// Calls waiting for a drain tick, newest last.
    queue: Arc<Mutex<Vec<Job>>>,
    /// The drain task, aborted on drop.
    ticker: JoinHandle<()>,
}

impl RateLimiter {
    /// A limiter starting at most `max_per_window` calls per one-second
    /// window. Must be created inside a Tokio runtime: the drain task is
    /// spawned here.
    #[must_use]
    pub fn bounded(max_per_window: usize) -> Self {
        Self::with_window(max_per_window, Duration::from_secs(1))
    }

    /// A bounded limiter with an explicit window length.
    #[must_use]
    pub fn with_window(max_per_window: usize, window: Duration) -> Self {
        let queue: Arc<Mutex<Vec<Job>>> = Arc::new(Mutex::new(Vec::new()));
        let drain_queue = Arc::clone(&queue);
        let ticker = tokio::spawn(async move {
            let mut tick = interval(window);
            // A delayed tick must not let the next one fire early, or two
            // drains could land inside one window.
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                drain(&drain_queue, max_per_window);
            }
        });
        Self {
            bounded: Some(Bounded { queue, ticker }),
        }
    }

    /// A limiter that starts every call immediately.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { bounded: None }
    }

    /// Schedules `call` and returns a future resolving with its outcome.
    ///
    /// The call is enqueued (or, unbounded, started) before this function
    /// returns; only the returned future awaits. A failing call reports its
    /// error to this caller alone and never disturbs the timer loop or other
    /// queued work.
    ///
    /// # Errors
    ///
    /// The returned future fails with the call's own error, or with a
    /// disposal error when the limiter was dropped before the call ran.
    pub fn schedule<T, F>(&self, call: F) -> impl Future<Output = Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            tokio::spawn(async move {
                // The caller may have gone away; a dead receiver is fine.
                let _ = tx.send(call.await);
            });
        });
        match &self.bounded {
            None => job(),
            Some(bounded) => {
                // SAFETY: drain and schedule never panic while holding the
                // lock, so it cannot be poisoned.
                #[allow(clippy::unwrap_used)]
                bounded.queue.lock().unwrap().push(job);
            }
        }
        async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(eyre!("Rate limiter disposed before the call ran")),
            }
        }
    }

    /// Number of calls still waiting for a drain tick.
    #[must_use]
    pub fn queued(&self) -> usize {
        match &self.bounded {
            None => 0,
            // SAFETY: drain and schedule never panic while holding the
            // lock, so it cannot be poisoned.
            #[allow(clippy::unwrap_used)]
            Some(bounded) => bounded.queue.lock().unwrap().len(),
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(bounded) = &self.bounded {
            bounded.ticker.abort();
        }
    }
}

/// Starts up to `budget` queued calls, newest first. The per-window counter
/// lives here and resets with every tick.
fn drain(queue: &Mutex<Vec<Job>>, budget: usize) {
    // Take the batch under the lock, fire after releasing it.
    let batch: Vec<Job> = {
        // SAFETY: drain and schedule never panic while holding the lock, so
        // it cannot be poisoned.
        #[allow(clippy::unwrap_used)]
        let mut queue = queue.lock().unwrap();
        let take = budget.min(queue.len());
        let mut batch = Vec::with_capacity(take);
        let mut started = 0;
        while started < budget {
            match queue.pop() {
                Some(job) => {
                    batch.push(job);
                    started += 1;
                }
                None => break,
            }
        }
        batch
    };
    for job in batch {
        job();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use futures::future::join_all;
    use tokio::time::{Duration, Instant};

    use super::RateLimiter;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_starts_at_most_budget_per_window() {
        let window = Duration::from_millis(100);
        let limiter = RateLimiter::with_window(2, window);
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

        let pending: Vec<_> = (0..6)
            .map(|_| {
                let starts = Arc::clone(&starts);
                limiter.schedule(async move {
                    starts.lock().unwrap().push(Instant::now());
                    Ok(())
                })
            })
            .collect();
        for outcome in join_all(pending).await {
            outcome.unwrap();
        }

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 6);

        // Paused time: every call started by the same tick shares an instant.
        let mut per_tick: BTreeMap<Instant, usize> = BTreeMap::new();
        for start in starts.iter() {
            *per_tick.entry(*start).or_default() += 1;
        }
        assert_eq!(per_tick.len(), 3);
        for count in per_tick.values() {
            assert!(*count <= 2, "a window started {count} calls");
        }
        let ticks: Vec<Instant> = per_tick.keys().copied().collect();
        for pair in ticks.windows(2) {
            assert!(pair[1] - pair[0] >= window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_newest_first() {
        let limiter = RateLimiter::with_window(10, Duration::from_millis(100));
        let order: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        let pending: Vec<_> = (0..4)
            .map(|i| {
                let order = Arc::clone(&order);
                limiter.schedule(async move {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
            })
            .collect();
        for outcome in join_all(pending).await {
            outcome.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![3, 2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_adds_no_delay() {
        let limiter = RateLimiter::unbounded();
        let before = Instant::now();
        let ran_at = limiter
            .schedule(async move { Ok(Instant::now()) })
            .await
            .unwrap();
        assert_eq!(ran_at, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_only_its_caller() {
        let limiter = RateLimiter::with_window(10, Duration::from_millis(50));
        let failing = limiter.schedule(async { Err::<(), _>(eyre::eyre!("venue offline")) });
        let healthy = limiter.schedule(async { Ok(7) });

        let (failing, healthy) = tokio::join!(failing, healthy);
        assert_eq!(failing.err().unwrap().to_string(), "venue offline");
        assert_eq!(healthy.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_abandons_queued_calls() {
        let limiter = RateLimiter::with_window(1, Duration::from_secs(3600));
        let pending: Vec<_> = (0..2).map(|_| limiter.schedule(async { Ok(()) })).collect();
        assert_eq!(limiter.queued(), 2);

        drop(limiter);
        for outcome in join_all(pending).await {
            assert_eq!(
                outcome.err().unwrap().to_string(),
                "Rate limiter disposed before the call ran"
            );
        }
    }
}
