//! Event dispatch: store transitions → handler callbacks.
//!
//! Every store mutation becomes exactly one [`Notification`]: an upsert of an
//! absent key is an add, an upsert of a present key is an update (even when
//! nothing changed, so resync re-delivery doubles as a heartbeat), and a delete
//! carries the last stored snapshot. The [`Dispatcher`] invokes the handler
//! in-line, in application order, and isolates handler errors and panics.

use crate::error::InformerError;
use crate::metrics::InformerMetrics;
use crate::store::ObjectKey;
use futures::FutureExt;
use kube::Resource;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Business callbacks for one collection.
///
/// Errors are logged by the dispatcher and never retried; a handler that needs
/// retries must arrange them itself.
#[async_trait::async_trait]
pub trait ResourceHandler<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Object seen for the first time.
    async fn on_add(&self, obj: Arc<K>) -> anyhow::Result<()>;

    /// Object seen again. `old` is the snapshot last delivered for this key.
    async fn on_update(&self, _old: Arc<K>, _new: Arc<K>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Object removed. Carries the last stored snapshot.
    async fn on_delete(&self, _obj: Arc<K>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A single store transition.
#[derive(Debug)]
pub enum Notification<K> {
    /// Key was absent
    Add(Arc<K>),
    /// Key was present
    Update {
        /// Previous snapshot
        old: Arc<K>,
        /// New snapshot
        new: Arc<K>,
    },
    /// Key was removed
    Delete(Arc<K>),
}

impl<K> Clone for Notification<K> {
    fn clone(&self) -> Self {
        match self {
            Self::Add(obj) => Self::Add(Arc::clone(obj)),
            Self::Update { old, new } => Self::Update {
                old: Arc::clone(old),
                new: Arc::clone(new),
            },
            Self::Delete(obj) => Self::Delete(Arc::clone(obj)),
        }
    }
}

impl<K> Notification<K> {
    /// Classify an upsert by what the store held before it.
    pub fn from_upsert(previous: Option<Arc<K>>, new: Arc<K>) -> Self {
        match previous {
            Some(old) => Self::Update { old, new },
            None => Self::Add(new),
        }
    }

    /// `add`, `update` or `delete`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update { .. } => "update",
            Self::Delete(_) => "delete",
        }
    }

    /// The snapshot the notification is about (the new one for updates).
    pub fn object(&self) -> &Arc<K> {
        match self {
            Self::Add(obj) | Self::Delete(obj) => obj,
            Self::Update { new, .. } => new,
        }
    }
}

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handler returned `Ok`
    Delivered,
    /// Handler returned an error or panicked; logged and dropped
    Failed,
    /// Cancellation was observed before the handler started
    Cancelled,
}

/// Invokes a handler for notifications of one collection.
pub struct Dispatcher<K> {
    collection: String,
    handler: Arc<dyn ResourceHandler<K>>,
    metrics: Option<InformerMetrics>,
    cancel: CancellationToken,
}

impl<K> Dispatcher<K>
where
    K: Resource + Send + Sync + 'static,
{
    /// Create a dispatcher. No handler is started once `cancel` fires.
    pub fn new(
        collection: impl Into<String>,
        handler: Arc<dyn ResourceHandler<K>>,
        metrics: Option<InformerMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collection: collection.into(),
            handler,
            metrics,
            cancel,
        }
    }

    /// Deliver one notification.
    pub async fn dispatch(&self, notification: Notification<K>) -> Delivery {
        if self.cancel.is_cancelled() {
            return Delivery::Cancelled;
        }

        let kind = notification.kind();
        let key = ObjectKey::from_resource(notification.object().as_ref());
        debug!(collection = %self.collection, %key, kind, "dispatching");

        let handler = Arc::clone(&self.handler);
        let call = async move {
            match notification {
                Notification::Add(obj) => handler.on_add(obj).await,
                Notification::Update { old, new } => handler.on_update(old, new).await,
                Notification::Delete(obj) => handler.on_delete(obj).await,
            }
        };

        let message = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(format!("{err:#}")),
            Err(panic) => Some(format!("panicked: {}", panic_message(panic.as_ref()))),
        };

        if let Some(metrics) = &self.metrics {
            metrics.notification(&self.collection, kind);
        }

        match message {
            None => Delivery::Delivered,
            Some(message) => {
                let failure = InformerError::HandlerFailure {
                    collection: self.collection.clone(),
                    key: key.to_string(),
                    kind,
                    message,
                };
                error!(collection = %self.collection, %key, kind, "{failure}");
                if let Some(metrics) = &self.metrics {
                    metrics.handler_failure(&self.collection);
                }
                Delivery::Failed
            }
        }
    }

    /// Deliver notifications in order. Returns `false` if cancellation stopped delivery.
    pub async fn dispatch_all(&self, notifications: Vec<Notification<K>>) -> bool {
        for notification in notifications {
            if self.dispatch(notification).await == Delivery::Cancelled {
                return false;
            }
        }
        true
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
