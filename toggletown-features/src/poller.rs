//! Background catalog refresh.

use crate::cache::FlagCache;
use crate::config::{DEFAULT_POLL_INTERVAL, ErrorCallback, StaleCallback};
use crate::error::FeatureError;
use crate::fetcher::FlagFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Callbacks fired from the refresh loop.
#[derive(Clone, Default)]
pub struct PollCallbacks {
    pub on_error: Option<ErrorCallback>,
    pub on_stale: Option<StaleCallback>,
}

/// Handle to the background refresh task.
///
/// The task's first refresh happens one full interval after [`Poller::start`];
/// the initial catalog is expected to be loaded by the caller.
pub struct Poller {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the refresh loop on the current tokio runtime.
    ///
    /// A zero `interval` is replaced by the default poll interval.
    pub fn start(
        fetcher: Arc<dyn FlagFetcher>,
        cache: Arc<FlagCache>,
        interval: Duration,
        callbacks: PollCallbacks,
    ) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        debug!(interval_ms = interval.as_millis() as u64, "Starting flag poller");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Also fires if the sender is dropped
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        refresh(fetcher.as_ref(), &cache, &callbacks).await;
                    }
                }
            }

            debug!("Flag poller stopped");
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to exit and wait for an in-flight refresh to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Flag poller task ended abnormally");
        }
        info!("Flag poller shut down");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Detached tasks still observe the signal on their next select.
        let _ = self.shutdown.send(true);
    }
}

/// Run one refresh: replace the cache on success, otherwise report the error
/// and check whether the retained catalog has gone stale.
pub(crate) async fn refresh(fetcher: &dyn FlagFetcher, cache: &FlagCache, callbacks: &PollCallbacks) {
    match fetcher.fetch().await {
        Ok(flags) => {
            debug!(flags = flags.len(), "Refreshed flag catalog");
            cache.replace(flags);
        }
        Err(e) => {
            let err = FeatureError::Refresh(e);
            warn!(error = %err, "Flag refresh failed, keeping last known catalog");
            if let Some(on_error) = &callbacks.on_error {
                on_error(&err);
            }

            if let Some(alarm) = cache.check_stale() {
                warn!(
                    last_updated_at = %alarm.last_updated_at,
                    age_secs = alarm.age.as_secs(),
                    "Flag catalog is stale"
                );
                if let Some(on_stale) = &callbacks.on_stale {
                    on_stale(alarm.last_updated_at, alarm.age);
                }
            }
        }
    }
}
