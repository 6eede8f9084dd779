//! # Controller
//!
//! Wires one reflector, local store, dispatcher and handler into a runnable
//! unit. One controller per watched collection; controllers share nothing but
//! the client connection pool and the metrics registry.
//!
//! ```text
//! NotStarted ──run()──▶ Running ──cancel──▶ Stopped
//! ```

use crate::dispatcher::{Dispatcher, ResourceHandler};
use crate::error::InformerError;
use crate::metrics::InformerMetrics;
use crate::reflector::{Reflector, ReflectorConfig};
use crate::store::{Reader, Store};
use kube::Resource;
use resource_client::{ResourceClient, SchemaDescriptor};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Lifecycle of a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// `run` has not been called
    NotStarted,
    /// `run` is in progress
    Running,
    /// `run` returned
    Stopped,
}

/// Shared, cloneable view of a controller's state (used by readiness probes).
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<Mutex<ControllerState>>);

impl StateHandle {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(ControllerState::NotStarted)))
    }

    /// Current state.
    pub fn get(&self) -> ControllerState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, state: ControllerState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move to `to` only if currently in `from`.
    fn transition(&self, from: ControllerState, to: ControllerState) -> bool {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }
}

/// A runnable watch-cache-reconcile loop for resources of type `K`.
pub struct Controller<K> {
    client: Arc<dyn ResourceClient<K>>,
    schema: Option<SchemaDescriptor>,
    handler: Arc<dyn ResourceHandler<K>>,
    config: ReflectorConfig,
    metrics: Option<InformerMetrics>,
    store: Store<K>,
    state: StateHandle,
}

impl<K> std::fmt::Debug for Controller<K>
where
    K: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("collection", &self.client.collection())
            .field("schema", &self.schema)
            .field("config", &self.config)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl<K> Controller<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    /// Create a controller.
    ///
    /// `schema` names the definition the collection depends on, if any; it is
    /// not registered here (see [`crate::Registrar`]) but is exposed through
    /// [`Controller::schema`] so the caller can bootstrap every controller's
    /// schema before running them.
    pub fn new(
        client: Arc<dyn ResourceClient<K>>,
        schema: impl Into<Option<SchemaDescriptor>>,
        resync_interval: Duration,
        handler: Arc<dyn ResourceHandler<K>>,
    ) -> Self {
        Self {
            client,
            schema: schema.into(),
            handler,
            config: ReflectorConfig::new(resync_interval),
            metrics: None,
            store: Store::new(),
            state: StateHandle::new(),
        }
    }

    /// Override the retry backoff bounds.
    #[must_use]
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.config.backoff_min = min;
        self.config.backoff_max = max;
        self
    }

    /// Record metrics for this controller.
    #[must_use]
    pub fn with_metrics(mut self, metrics: InformerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Collection this controller watches.
    pub fn collection(&self) -> &str {
        self.client.collection()
    }

    /// Schema the collection depends on.
    pub fn schema(&self) -> Option<&SchemaDescriptor> {
        self.schema.as_ref()
    }

    /// Read-only view of the local store.
    pub fn reader(&self) -> Reader<K> {
        self.store.reader()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state.get()
    }

    /// Cloneable state view that outlives borrows of the controller.
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Run the list/watch loop until `cancel` fires.
    ///
    /// Steady-state failures are retried internally and never returned.
    ///
    /// # Errors
    ///
    /// [`InformerError::AlreadyStarted`] if the controller was run before.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), InformerError> {
        let collection = self.client.collection().to_string();
        if !self
            .state
            .transition(ControllerState::NotStarted, ControllerState::Running)
        {
            return Err(InformerError::AlreadyStarted(collection));
        }
        info!(
            collection = %collection,
            resync_secs = self.config.resync_interval.as_secs(),
            "controller started"
        );

        let dispatcher = Dispatcher::new(
            collection.clone(),
            Arc::clone(&self.handler),
            self.metrics.clone(),
            cancel.clone(),
        );
        let reflector = Reflector::new(
            Arc::clone(&self.client),
            self.store.clone(),
            dispatcher,
            self.config,
            self.metrics.clone(),
            cancel,
        );
        reflector.run().await;

        self.state.set(ControllerState::Stopped);
        info!(collection = %collection, "controller stopped");
        Ok(())
    }
}
