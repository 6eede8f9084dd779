//! List/watch synchronization of one collection into a [`Store`].
//!
//! The reflector alternates between two phases:
//!
//! - **List**: fetch every object, swap the store contents with
//!   [`Store::replace_all`] and dispatch the resulting delta. The watch cursor
//!   becomes the list's resource version.
//! - **Watch**: stream changes from the cursor, applying each one to the store
//!   and dispatching it before reading the next.
//!
//! Lists are gated by the resync interval, measured from the start of the last
//! successful list. A watch that ends or fails before the resync deadline is
//! reopened from the cursor after a backoff; only an expired cursor (410) or
//! the deadline itself sends the reflector back to the list phase.

use crate::backoff::FibonacciBackoff;
use crate::dispatcher::{Delivery, Dispatcher, Notification};
use crate::metrics::InformerMetrics;
use crate::store::{ObjectKey, Store};
use futures::StreamExt;
use kube::{Resource, ResourceExt};
use resource_client::{ClientError, ResourceClient, WatchEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timing knobs for a reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectorConfig {
    /// Minimum time between two list calls
    pub resync_interval: Duration,
    /// First retry delay after a failure
    pub backoff_min: Duration,
    /// Retry delay cap
    pub backoff_max: Duration,
}

impl ReflectorConfig {
    /// Config with the given resync interval and default backoff bounds (500ms..30s).
    pub fn new(resync_interval: Duration) -> Self {
        Self {
            resync_interval,
            backoff_min: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// How one watch attempt finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchOutcome {
    Cancelled,
    ResyncDue,
    CursorExpired,
    Ended,
    Failed,
}

impl WatchOutcome {
    fn reason(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::ResyncDue => "resync",
            Self::CursorExpired => "expired",
            Self::Ended => "ended",
            Self::Failed => "failed",
        }
    }
}

enum Phase {
    List,
    Watch,
}

pub(crate) struct Reflector<K> {
    collection: String,
    client: Arc<dyn ResourceClient<K>>,
    store: Store<K>,
    dispatcher: Dispatcher<K>,
    config: ReflectorConfig,
    metrics: Option<InformerMetrics>,
    cancel: CancellationToken,
    cursor: Option<String>,
    last_list: Option<Instant>,
    backoff: FibonacciBackoff,
}

impl<K> Reflector<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        client: Arc<dyn ResourceClient<K>>,
        store: Store<K>,
        dispatcher: Dispatcher<K>,
        config: ReflectorConfig,
        metrics: Option<InformerMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: client.collection().to_string(),
            client,
            store,
            dispatcher,
            config,
            metrics,
            cancel,
            cursor: None,
            last_list: None,
            backoff: FibonacciBackoff::new(config.backoff_min, config.backoff_max),
        }
    }

    /// Run until cancelled.
    pub(crate) async fn run(mut self) {
        let mut phase = Phase::List;
        loop {
            phase = match phase {
                Phase::List => {
                    if !self.list_phase().await {
                        break;
                    }
                    Phase::Watch
                }
                Phase::Watch => {
                    let outcome = self.watch_once().await;
                    if outcome != WatchOutcome::Cancelled {
                        if let Some(metrics) = &self.metrics {
                            metrics.watch_restart(&self.collection, outcome.reason());
                        }
                    }
                    match outcome {
                        WatchOutcome::Cancelled => break,
                        WatchOutcome::ResyncDue => {
                            debug!(collection = %self.collection, "resync due");
                            Phase::List
                        }
                        WatchOutcome::CursorExpired => {
                            info!(collection = %self.collection, "watch cursor expired, relisting");
                            self.cursor = None;
                            Phase::List
                        }
                        WatchOutcome::Ended | WatchOutcome::Failed => {
                            if !self.pause().await {
                                break;
                            }
                            Phase::Watch
                        }
                    }
                }
            };
        }
        debug!(collection = %self.collection, "reflector stopped");
    }

    /// Wait for the resync gate, list and dispatch. Returns `false` when cancelled.
    async fn list_phase(&mut self) -> bool {
        loop {
            if let Some(last) = self.last_list {
                let due = last + self.config.resync_interval;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return false,
                    _ = sleep_until(due) => {}
                }
            }

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = self.client.list() => result,
            };

            match result {
                Ok(page) => {
                    self.backoff.reset();
                    self.last_list = Some(started);

                    let items = page
                        .items
                        .into_iter()
                        .map(|obj| (ObjectKey::from_resource(&obj), Arc::new(obj)))
                        .collect();
                    let delta = self.store.replace_all(items);
                    info!(
                        collection = %self.collection,
                        resource_version = %page.resource_version,
                        objects = self.store.len(),
                        added = delta.added.len(),
                        removed = delta.removed.len(),
                        "listed"
                    );
                    self.cursor = Some(page.resource_version);
                    if let Some(metrics) = &self.metrics {
                        metrics.relist(&self.collection);
                    }
                    self.record_store_size();

                    return self.dispatcher.dispatch_all(delta.notifications).await;
                }
                Err(err) => {
                    warn!(collection = %self.collection, error = %err, "list failed");
                    if !self.pause().await {
                        return false;
                    }
                }
            }
        }
    }

    /// Open a watch from the cursor and apply events until it stops.
    async fn watch_once(&mut self) -> WatchOutcome {
        let Some(since) = self.cursor.clone() else {
            return WatchOutcome::CursorExpired;
        };
        let deadline = self.last_list.unwrap_or_else(Instant::now) + self.config.resync_interval;

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return WatchOutcome::Cancelled,
            _ = sleep_until(deadline) => return WatchOutcome::ResyncDue,
            opened = self.client.watch(&since) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => return self.classify(&err, "watch failed to open"),
        };
        debug!(collection = %self.collection, resource_version = %since, "watching");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return WatchOutcome::Cancelled,
                _ = sleep_until(deadline) => return WatchOutcome::ResyncDue,
                next = stream.next() => next,
            };
            match next {
                None => {
                    debug!(collection = %self.collection, "watch stream ended");
                    return WatchOutcome::Ended;
                }
                Some(Err(err)) => return self.classify(&err, "watch stream failed"),
                Some(Ok(event)) => {
                    if let Some(outcome) = self.apply(event).await {
                        return outcome;
                    }
                }
            }
        }
    }

    fn classify(&self, err: &ClientError, context: &str) -> WatchOutcome {
        if err.is_cursor_expired() {
            WatchOutcome::CursorExpired
        } else {
            warn!(collection = %self.collection, error = %err, "{context}");
            WatchOutcome::Failed
        }
    }

    /// Apply one event to the store and dispatch it. `Some` stops the watch.
    async fn apply(&mut self, event: WatchEvent<K>) -> Option<WatchOutcome> {
        self.backoff.reset();

        let notification = match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                let key = ObjectKey::from_resource(&obj);
                let version = obj.resource_version();
                if let Some(stored) = self.store.get(&key) {
                    if is_stale(stored.resource_version().as_deref(), version.as_deref()) {
                        debug!(
                            collection = %self.collection,
                            %key,
                            resource_version = ?version,
                            "dropping stale event"
                        );
                        self.advance(version);
                        return None;
                    }
                }
                let obj = Arc::new(obj);
                let previous = self.store.upsert(key, Arc::clone(&obj));
                self.advance(version);
                Some(Notification::from_upsert(previous, obj))
            }
            WatchEvent::Deleted(obj) => {
                let key = ObjectKey::from_resource(&obj);
                self.advance(obj.resource_version());
                match self.store.delete(&key) {
                    Some(last) => Some(Notification::Delete(last)),
                    None => {
                        debug!(collection = %self.collection, %key, "delete for unknown object");
                        None
                    }
                }
            }
            WatchEvent::Bookmark(version) => {
                self.cursor = Some(version);
                None
            }
            WatchEvent::Error(err) => {
                return Some(if err.is_cursor_expired() {
                    WatchOutcome::CursorExpired
                } else {
                    warn!(collection = %self.collection, error = %err, "watch reported an error");
                    WatchOutcome::Ended
                });
            }
        };

        self.record_store_size();
        match notification {
            Some(notification) => match self.dispatcher.dispatch(notification).await {
                Delivery::Cancelled => Some(WatchOutcome::Cancelled),
                Delivery::Delivered | Delivery::Failed => None,
            },
            None => None,
        }
    }

    /// Move the cursor to `version`, never backwards.
    fn advance(&mut self, version: Option<String>) {
        if let Some(version) = version {
            if !is_stale(self.cursor.as_deref(), Some(&version)) {
                self.cursor = Some(version);
            }
        }
    }

    fn record_store_size(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.set_store_objects(&self.collection, self.store.len());
        }
    }

    /// Sleep for the next backoff delay. Returns `false` when cancelled.
    async fn pause(&mut self) -> bool {
        let delay = self.backoff.next_backoff();
        debug!(collection = %self.collection, ?delay, "backing off");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }
}

/// Whether `incoming` is older than `stored`. Versions that do not parse as
/// integers are opaque and never considered stale.
fn is_stale(stored: Option<&str>, incoming: Option<&str>) -> bool {
    match (
        stored.and_then(|v| v.parse::<u64>().ok()),
        incoming.and_then(|v| v.parse::<u64>().ok()),
    ) {
        (Some(stored), Some(incoming)) => incoming < stored,
        _ => false,
    }
}
