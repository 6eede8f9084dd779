//! Prometheus metrics for reflectors and dispatchers.
//!
//! Metrics live in a caller-supplied [`Registry`] rather than the global
//! default one, so several independent test runs can coexist in one process.

use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

/// Counters and gauges shared by every controller of a process.
#[derive(Debug, Clone)]
pub struct InformerMetrics {
    notifications: IntCounterVec,
    handler_failures: IntCounterVec,
    relists: IntCounterVec,
    watch_restarts: IntCounterVec,
    store_objects: IntGaugeVec,
}

impl InformerMetrics {
    /// Create the metric families and register them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let notifications = IntCounterVec::new(
            Opts::new(
                "informer_notifications_total",
                "Notifications delivered to handlers",
            ),
            &["collection", "kind"],
        )?;
        let handler_failures = IntCounterVec::new(
            Opts::new(
                "informer_handler_failures_total",
                "Handler callbacks that returned an error or panicked",
            ),
            &["collection"],
        )?;
        let relists = IntCounterVec::new(
            Opts::new("informer_relists_total", "Successful full list calls"),
            &["collection"],
        )?;
        let watch_restarts = IntCounterVec::new(
            Opts::new(
                "informer_watch_restarts_total",
                "Watch streams that ended, failed or expired",
            ),
            &["collection", "reason"],
        )?;
        let store_objects = IntGaugeVec::new(
            Opts::new("informer_store_objects", "Objects held in the local store"),
            &["collection"],
        )?;

        registry.register(Box::new(notifications.clone()))?;
        registry.register(Box::new(handler_failures.clone()))?;
        registry.register(Box::new(relists.clone()))?;
        registry.register(Box::new(watch_restarts.clone()))?;
        registry.register(Box::new(store_objects.clone()))?;

        Ok(Self {
            notifications,
            handler_failures,
            relists,
            watch_restarts,
            store_objects,
        })
    }

    pub(crate) fn notification(&self, collection: &str, kind: &str) {
        self.notifications.with_label_values(&[collection, kind]).inc();
    }

    pub(crate) fn handler_failure(&self, collection: &str) {
        self.handler_failures.with_label_values(&[collection]).inc();
    }

    pub(crate) fn relist(&self, collection: &str) {
        self.relists.with_label_values(&[collection]).inc();
    }

    pub(crate) fn watch_restart(&self, collection: &str, reason: &str) {
        self.watch_restarts.with_label_values(&[collection, reason]).inc();
    }

    pub(crate) fn set_store_objects(&self, collection: &str, count: usize) {
        self.store_objects
            .with_label_values(&[collection])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
