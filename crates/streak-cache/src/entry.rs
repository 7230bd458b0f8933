//! Single cached value with stale-while-revalidate reads
//!
//! Concurrent refresh requests share one in-flight fetch. Each started fetch
//! takes the next generation number and is committed only while it is still
//! the latest one started, so an older response never overwrites a newer
//! value.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use streak_gateway::GatewayError;

use crate::navigator::Navigator;
use crate::policy::EntryPolicy;
use crate::state::EntryState;

type Fetcher<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, GatewayError>> + Send + Sync>;

struct InFlight<T> {
    generation: u64,
    future: Shared<BoxFuture<'static, T>>,
}

struct EntryInner<T> {
    state: EntryState,
    /// Last good value
    value: Option<T>,
    fetched_at: Option<Instant>,
    /// Generation of the most recently started fetch
    generation: u64,
    /// Bumped by every invalidation
    epoch: u64,
    /// Set until a fetch started after the last invalidation commits
    invalidated: bool,
    in_flight: Option<InFlight<T>>,
}

impl<T> EntryInner<T> {
    fn transition(&mut self, entry: &'static str, target: EntryState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "{entry}: invalid transition {} -> {}",
            self.state,
            target
        );
        if self.state != target {
            tracing::trace!(entry, from = %self.state, to = %target, "Entry state changed");
        }
        self.state = target;
    }

    fn is_expired(&self, policy: &EntryPolicy, now: Instant) -> bool {
        self.fetched_at
            .map_or(true, |at| now.duration_since(at) >= policy.freshness)
    }
}

enum Resolution<T> {
    Fetched(T),
    SignedOut,
    Failed,
}

pub struct QueryEntry<T> {
    name: &'static str,
    policy: EntryPolicy,
    /// Served when nothing good has been fetched
    empty: T,
    fetcher: Fetcher<T>,
    navigator: Arc<dyn Navigator>,
    inner: Arc<Mutex<EntryInner<T>>>,
}

impl<T> QueryEntry<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(
        name: &'static str,
        policy: EntryPolicy,
        empty: T,
        navigator: Arc<dyn Navigator>,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        Self {
            name,
            policy,
            empty,
            fetcher: Arc::new(move || fetch().boxed()),
            navigator,
            inner: Arc::new(Mutex::new(EntryInner {
                state: EntryState::Empty,
                value: None,
                fetched_at: None,
                generation: 0,
                epoch: 0,
                invalidated: false,
                in_flight: None,
            })),
        }
    }

    /// Current state, with expiry and invalidation applied
    pub fn state(&self) -> EntryState {
        let inner = self.inner.lock();
        match inner.state {
            EntryState::Fresh
                if inner.invalidated || inner.is_expired(&self.policy, Instant::now()) =>
            {
                EntryState::Stale
            }
            state => state,
        }
    }

    /// True when the next read would trigger a fetch
    pub fn is_stale(&self) -> bool {
        let inner = self.inner.lock();
        inner.value.is_none()
            || inner.invalidated
            || inner.is_expired(&self.policy, Instant::now())
    }

    /// Cached value without fetching anything
    pub fn peek(&self) -> T {
        self.inner
            .lock()
            .value
            .clone()
            .unwrap_or_else(|| self.empty.clone())
    }

    /// Read the entry.
    ///
    /// A fresh value is returned as is. An expired one is returned immediately
    /// while a background refresh runs. An entry that was never populated or
    /// has been invalidated waits for a refresh.
    pub async fn read(&self) -> T {
        let cached = {
            let inner = self.inner.lock();
            match &inner.value {
                Some(value) if !inner.invalidated => Some((
                    value.clone(),
                    inner.is_expired(&self.policy, Instant::now()),
                )),
                _ => None,
            }
        };

        match cached {
            Some((value, false)) => value,
            Some((value, true)) => {
                tracing::debug!(entry = self.name, "Serving stale value, refreshing in background");
                let entry = self.clone();
                tokio::spawn(async move {
                    entry.request_refresh().await;
                });
                value
            }
            None => self.request_refresh().await,
        }
    }

    /// Refresh now, or join the refresh already in flight.
    pub async fn request_refresh(&self) -> T {
        let future = {
            let mut inner = self.inner.lock();
            match &inner.in_flight {
                Some(in_flight) => {
                    tracing::trace!(
                        entry = self.name,
                        generation = in_flight.generation,
                        "Joining in-flight fetch"
                    );
                    in_flight.future.clone()
                }
                None => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    let epoch = inner.epoch;
                    inner.transition(self.name, EntryState::Fetching);

                    let future = self.clone().run(generation, epoch).boxed().shared();
                    inner.in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        future.await
    }

    /// Force the next read to refetch. A fetch already in flight is detached:
    /// later refresh requests start a new one instead of joining it.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        inner.invalidated = true;
        inner.in_flight = None;

        let target = if inner.value.is_some() {
            EntryState::Stale
        } else {
            EntryState::Empty
        };
        inner.transition(self.name, target);

        tracing::debug!(entry = self.name, epoch = inner.epoch, "Entry invalidated");
    }

    async fn run(self, generation: u64, epoch: u64) -> T {
        let resolution = self.fetch_with_retry(generation).await;
        self.commit(generation, epoch, resolution)
    }

    async fn fetch_with_retry(&self, generation: u64) -> Resolution<T> {
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            match (self.fetcher)().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            entry = self.name,
                            generation,
                            attempt,
                            "Fetch recovered after retries"
                        );
                    }
                    return Resolution::Fetched(value);
                }
                Err(e) if e.is_auth_expired() => {
                    self.navigator.redirect_to_sign_in();
                    return Resolution::SignedOut;
                }
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(entry = self.name, generation, error = %e, "Fetch failed");
                    return Resolution::Failed;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        entry = self.name,
                        generation,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = self.policy.retry_delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    tracing::warn!(
                        entry = self.name,
                        generation,
                        attempts,
                        error = %e,
                        "Fetch failed, attempts exhausted"
                    );
                }
            }
        }

        Resolution::Failed
    }

    fn commit(&self, generation: u64, epoch: u64, resolution: Resolution<T>) -> T {
        let mut inner = self.inner.lock();

        if inner
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            inner.in_flight = None;
        }

        if generation != inner.generation {
            tracing::debug!(
                entry = self.name,
                generation,
                latest = inner.generation,
                "Discarding superseded fetch"
            );
            return match resolution {
                Resolution::Fetched(value) => value,
                Resolution::SignedOut => self.empty.clone(),
                Resolution::Failed => inner.value.clone().unwrap_or_else(|| self.empty.clone()),
            };
        }

        let value = match resolution {
            Resolution::Fetched(value) => value,
            Resolution::SignedOut => self.empty.clone(),
            Resolution::Failed => {
                let target = if inner.value.is_some() {
                    EntryState::Stale
                } else {
                    EntryState::Empty
                };
                inner.transition(self.name, target);
                tracing::warn!(
                    entry = self.name,
                    has_last_good = inner.value.is_some(),
                    "Serving fallback value"
                );
                return inner.value.clone().unwrap_or_else(|| self.empty.clone());
            }
        };

        inner.value = Some(value.clone());
        inner.fetched_at = Some(Instant::now());
        // Started before a mutation invalidated the entry: keep it stale
        inner.invalidated = epoch != inner.epoch;
        let target = if inner.invalidated {
            EntryState::Stale
        } else {
            EntryState::Fresh
        };
        inner.transition(self.name, target);

        value
    }
}

impl<T> Clone for QueryEntry<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            policy: self.policy,
            empty: self.empty.clone(),
            fetcher: Arc::clone(&self.fetcher),
            navigator: Arc::clone(&self.navigator),
            inner: Arc::clone(&self.inner),
        }
    }
}
