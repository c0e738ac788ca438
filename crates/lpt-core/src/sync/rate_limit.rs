//! FIFO request queue with a minimum spacing between dispatches.
//!
//! Every outbound basket request goes through one [`RateLimiter`]. Requests
//! are executed one at a time in enqueue order; a request starts no sooner
//! than `interval` after the previous one *finished*, so failed requests
//! still consume budget.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout, Instant};

use crate::config::DEFAULT_RATE_LIMIT_INTERVAL_MS;
use crate::error::{Error, Result};
use crate::util::now_millis;

/// Minimum spacing between two remote requests.
pub const RATE_LIMIT_INTERVAL: Duration =
    Duration::from_millis(DEFAULT_RATE_LIMIT_INTERVAL_MS);

/// Hands a finished request's outcome to the caller waiting on it.
type Settle = Box<dyn FnOnce() + Send>;
type JobFuture = Pin<Box<dyn Future<Output = Settle> + Send>>;
type Job = Box<dyn FnOnce(Option<Duration>) -> JobFuture + Send>;

/// Point-in-time view of the limiter, cheap enough to poll every second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub can_make_request: bool,
    /// Milliseconds until the next request may start
    pub time_until_next_request: u64,
    /// Requests waiting behind the one in flight
    pub queue_length: usize,
    /// Unix ms of the last completed request, 0 when none
    pub last_request_time: i64,
}

/// FIFO request limiter; clones share one queue and one interval budget.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    interval: Duration,
    request_timeout: Option<Duration>,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    queue: VecDeque<Job>,
    is_draining: bool,
    last_request: Option<Instant>,
    last_request_epoch_ms: i64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_INTERVAL, None)
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(interval: Duration, request_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                interval,
                request_timeout,
                state: Mutex::new(LimiterState::default()),
            }),
        }
    }

    /// Seed the limiter with a dispatch time persisted by an earlier process.
    #[must_use]
    pub fn resume_from(self, last_request_epoch_ms: i64) -> Self {
        if last_request_epoch_ms <= 0 {
            return self;
        }
        let elapsed_ms =
            u64::try_from(now_millis().saturating_sub(last_request_epoch_ms)).unwrap_or(0);
        {
            let mut state = self.lock_state();
            state.last_request = Instant::now().checked_sub(Duration::from_millis(elapsed_ms));
            state.last_request_epoch_ms = last_request_epoch_ms;
        }
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// True when a request enqueued now would start without waiting.
    #[must_use]
    pub fn can_make_request(&self) -> bool {
        let state = self.lock_state();
        self.remaining_wait(&state, Instant::now()).is_zero()
    }

    #[must_use]
    pub fn status(&self) -> RateLimitStatus {
        let state = self.lock_state();
        let wait = self.remaining_wait(&state, Instant::now());
        RateLimitStatus {
            can_make_request: wait.is_zero(),
            time_until_next_request: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            queue_length: state.queue.len(),
            last_request_time: state.last_request_epoch_ms,
        }
    }

    /// Queue a request and wait for its own outcome.
    ///
    /// The slot is taken when this is called, not when the returned future is
    /// first polled. Rate limiting never fails a request; only the request
    /// itself (or the configured timeout) can. Dropping the returned future
    /// does not remove the request from the queue.
    pub fn enqueue<F, Fut, T>(
        &self,
        request: F,
    ) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let job: Job = Box::new(move |request_timeout: Option<Duration>| {
            Box::pin(async move {
                let outcome = match request_timeout {
                    Some(limit) => timeout(limit, request())
                        .await
                        .unwrap_or_else(|_| Err(Error::Timeout(limit))),
                    None => request().await,
                };
                Box::new(move || {
                    // The caller may have stopped waiting; the request still ran.
                    let _ = sender.send(outcome);
                }) as Settle
            }) as JobFuture
        });

        let start_drain = {
            let mut state = self.lock_state();
            state.queue.push_back(job);
            !std::mem::replace(&mut state.is_draining, true)
        };
        if start_drain {
            tokio::spawn(self.clone().drain());
        }

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(Error::RequestDropped))
        }
    }

    async fn drain(self) {
        loop {
            let (job, wait) = {
                let mut state = self.lock_state();
                let Some(job) = state.queue.pop_front() else {
                    state.is_draining = false;
                    return;
                };
                (job, self.remaining_wait(&state, Instant::now()))
            };

            if !wait.is_zero() {
                tracing::debug!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Rate limit: waiting before next request"
                );
                sleep(wait).await;
            }

            let settle = job(self.inner.request_timeout).await;

            {
                let mut state = self.lock_state();
                state.last_request = Some(Instant::now());
                state.last_request_epoch_ms = now_millis();
                tracing::debug!(
                    queue_length = state.queue.len(),
                    "Rate-limited request finished"
                );
            }
            settle();
        }
    }

    fn remaining_wait(&self, state: &LimiterState, now: Instant) -> Duration {
        state.last_request.map_or(Duration::ZERO, |last| {
            self.inner
                .interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, LimiterState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn fresh_limiter_allows_request() {
        let limiter = RateLimiter::new(INTERVAL, None);
        let status = limiter.status();
        assert!(status.can_make_request);
        assert_eq!(status.time_until_next_request, 0);
        assert_eq!(status.queue_length, 0);
        assert_eq!(status.last_request_time, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_requests_are_spaced_by_interval() {
        let limiter = RateLimiter::new(INTERVAL, None);

        let first = limiter.enqueue(|| async { Ok(Instant::now()) });
        let second = limiter.enqueue(|| async { Ok(Instant::now()) });
        let (first, second) = tokio::join!(first, second);

        let gap = second.unwrap() - first.unwrap();
        assert!(gap >= INTERVAL, "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cloned_limiters_share_the_interval() {
        let limiter = RateLimiter::new(INTERVAL, None);
        let other = limiter.clone();

        let first = limiter.enqueue(|| async { Ok(Instant::now()) });
        let second = other.enqueue(|| async { Ok(Instant::now()) });
        let (first, second) = tokio::join!(first, second);

        let gap = second.unwrap() - first.unwrap();
        assert!(gap >= INTERVAL, "gap was {gap:?}");
        assert!(!other.status().can_make_request);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_run_in_fifo_order() {
        let limiter = RateLimiter::new(Duration::from_millis(10), None);
        let order = Arc::new(Mutex::new(Vec::new()));

        let pending: Vec<_> = (0..4)
            .map(|index| {
                let order = Arc::clone(&order);
                limiter.enqueue(move || async move {
                    order.lock().unwrap().push(index);
                    Ok(())
                })
            })
            .collect();
        for request in pending {
            request.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_request_consumes_budget_and_queue_continues() {
        let limiter = RateLimiter::new(INTERVAL, None);
        let started = Instant::now();

        let failing = limiter.enqueue(|| async {
            Err::<(), _>(Error::Transport {
                status: 500,
                status_text: "Internal Server Error".to_string(),
            })
        });
        let next = limiter.enqueue(|| async { Ok(Instant::now()) });

        let (failing, next) = tokio::join!(failing, next);
        assert!(matches!(failing, Err(Error::Transport { status: 500, .. })));
        assert!(next.unwrap() - started >= INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_request_times_out_without_stalling_queue() {
        let limiter = RateLimiter::new(Duration::from_secs(1), Some(Duration::from_secs(5)));
        let calls = Arc::new(AtomicUsize::new(0));

        let hung = limiter.enqueue(|| async {
            sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        let counter = Arc::clone(&calls);
        let after = limiter.enqueue(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let (hung, after) = tokio::join!(hung, after);
        assert!(matches!(hung, Err(Error::Timeout(_))));
        assert!(after.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_wait_after_request() {
        let limiter = RateLimiter::new(INTERVAL, None);
        limiter.enqueue(|| async { Ok(()) }).await.unwrap();

        let status = limiter.status();
        assert!(!status.can_make_request);
        assert!(!limiter.can_make_request());
        assert_eq!(status.time_until_next_request, 60_000);
        assert!(status.last_request_time > 0);

        tokio::time::advance(INTERVAL).await;
        assert!(limiter.can_make_request());
    }

    #[tokio::test(start_paused = true)]
    async fn status_counts_waiting_requests() {
        let limiter = RateLimiter::new(INTERVAL, None);
        limiter.enqueue(|| async { Ok(()) }).await.unwrap();

        let second = limiter.enqueue(|| async { Ok(()) });
        let third = limiter.enqueue(|| async { Ok(()) });
        assert_eq!(limiter.status().queue_length, 2);

        let (second, third) = tokio::join!(second, third);
        assert!(second.is_ok() && third.is_ok());
        assert_eq!(limiter.status().queue_length, 0);
    }

    #[tokio::test]
    async fn resume_from_recent_dispatch_blocks_immediate_request() {
        let limiter = RateLimiter::new(INTERVAL, None).resume_from(now_millis() - 1_000);
        let status = limiter.status();
        assert!(!status.can_make_request);
        assert!(status.time_until_next_request > 50_000);

        let stale = RateLimiter::new(INTERVAL, None).resume_from(now_millis() - 120_000);
        assert!(stale.can_make_request());
    }
}
