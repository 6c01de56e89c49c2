//! Bounded, cancellable polling of a long-running backend job.
//!
//! The first fetch happens immediately; each result is delivered to the tick
//! handler before the poller decides whether to stop or wait another
//! interval.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until done or cancelled.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    Done(T),
    TimedOut { attempts: u32 },
    Failed(E),
    Cancelled,
}

/// Event stream produced by [`JobPoller::spawn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent<T, E> {
    Tick { attempt: u32, value: T },
    Finished(PollOutcome<T, E>),
}

pub struct JobPoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl JobPoller {
    pub fn new(policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Polls until `is_done`, the attempt cap, a fetch error or cancellation.
    ///
    /// A fetch that resolves after cancellation is not delivered.
    pub async fn run<T, E, F, Fut, D, H, HFut>(
        &self,
        mut fetch: F,
        is_done: D,
        mut on_tick: H,
    ) -> PollOutcome<T, E>
    where
        T: Clone,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        D: Fn(&T) -> bool,
        H: FnMut(u32, T) -> HFut,
        HFut: Future<Output = ()>,
    {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }
            attempt += 1;
            trace!(attempt, "poll fetch");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PollOutcome::Cancelled,
                result = fetch() => result,
            };
            if self.cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let value = match result {
                Ok(value) => value,
                Err(err) => return PollOutcome::Failed(err),
            };
            on_tick(attempt, value.clone()).await;

            if is_done(&value) {
                debug!(attempt, "poll finished");
                return PollOutcome::Done(value);
            }
            if self.policy.max_attempts.is_some_and(|max| attempt >= max) {
                debug!(attempt, "poll attempts exhausted");
                return PollOutcome::TimedOut { attempts: attempt };
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }

    /// Runs the poll on a background task and streams every tick followed by
    /// the final outcome.
    pub fn spawn<T, E, F, Fut, D>(
        self,
        fetch: F,
        is_done: D,
    ) -> (JoinHandle<()>, mpsc::UnboundedReceiver<PollEvent<T, E>>)
    where
        T: Clone + Send + 'static,
        E: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        D: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let tick_tx = tx.clone();
            let outcome = self
                .run(fetch, is_done, move |attempt, value| {
                    let _ = tick_tx.send(PollEvent::Tick { attempt, value });
                    async {}
                })
                .await;
            let _ = tx.send(PollEvent::Finished(outcome));
        });
        (handle, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn never_done_stops_after_max_attempts() {
        let fetches = Arc::new(AtomicU32::new(0));
        let poller = JobPoller::new(
            PollPolicy::bounded(Duration::from_secs(5), 3),
            CancellationToken::new(),
        );

        let counter = fetches.clone();
        let outcome: PollOutcome<u32, ()> = poller
            .run(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { Ok(n) }
                },
                |_| false,
                |_, _| async {},
            )
            .await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_is_immediate_and_ticks_precede_outcome() {
        let start = tokio::time::Instant::now();
        let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let poller = JobPoller::new(
            PollPolicy::unbounded(Duration::from_secs(2)),
            CancellationToken::new(),
        );

        let mut n = 0u32;
        let log = seen.clone();
        let outcome: PollOutcome<u32, ()> = poller
            .run(
                move || {
                    n += 1;
                    let value = n;
                    async move { Ok(value) }
                },
                |v| *v == 3,
                move |attempt, value| {
                    let log = log.clone();
                    async move {
                        log.lock().await.push((attempt, value));
                    }
                },
            )
            .await;

        assert_eq!(outcome, PollOutcome::Done(3));
        assert_eq!(*seen.lock().await, vec![(1, 1), (2, 2), (3, 3)]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_fails_the_poll() {
        let poller = JobPoller::new(
            PollPolicy::unbounded(Duration::from_secs(2)),
            CancellationToken::new(),
        );
        let outcome: PollOutcome<u32, &str> = poller
            .run(|| async { Err("boom") }, |_| false, |_, _| async {})
            .await;
        assert_eq!(outcome, PollOutcome::Failed("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_further_ticks() {
        let cancel = CancellationToken::new();
        let poller = JobPoller::new(PollPolicy::unbounded(Duration::from_secs(2)), cancel.clone());

        let (handle, mut rx) = poller.spawn(|| async { Ok::<_, ()>(0u32) }, |_| false);

        assert!(matches!(
            rx.recv().await,
            Some(PollEvent::Tick { attempt: 1, .. })
        ));
        cancel.cancel();

        let mut rest = Vec::new();
        while let Some(event) = rx.recv().await {
            rest.push(event);
        }
        handle.await.unwrap();
        assert_eq!(rest, vec![PollEvent::Finished(PollOutcome::Cancelled)]);
    }
}
