//! Refresh triggers
//!
//! Timer ticks, focus and reconnect events all funnel into
//! `request_refresh`, which shares any fetch already in flight.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::cache::{EntryKey, TimerCache};

#[derive(Clone)]
pub struct RefreshScheduler {
    cache: TimerCache,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl RefreshScheduler {
    pub fn new(cache: TimerCache, poll_interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            cache,
            poll_interval,
            shutdown,
        }
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Periodic poll: the active session only.
    pub async fn on_tick(&self) {
        if self.is_shut_down() {
            return;
        }
        self.cache.request_refresh(EntryKey::Active).await;
    }

    pub async fn on_focus(&self) {
        self.refresh_for_event("focus").await;
    }

    pub async fn on_reconnect(&self) {
        self.refresh_for_event("reconnect").await;
    }

    pub async fn request_refresh(&self, key: EntryKey) {
        if self.is_shut_down() {
            tracing::debug!(entry = %key, "Ignoring refresh after shutdown");
            return;
        }
        self.cache.request_refresh(key).await;
    }

    /// Active always refreshes; history only once it has gone stale.
    async fn refresh_for_event(&self, event: &'static str) {
        if self.is_shut_down() {
            return;
        }
        tracing::debug!(event, "Refreshing on client event");

        let history = async {
            if self.cache.is_stale(EntryKey::History) {
                self.cache.request_refresh(EntryKey::History).await;
            }
        };
        tokio::join!(self.cache.request_refresh(EntryKey::Active), history);
    }

    /// Drive `on_tick` every poll interval until shutdown is signalled.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        tracing::info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "Refresh scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => self.on_tick().await,
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Refresh scheduler stopped");
    }
}
