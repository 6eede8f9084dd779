//! Watch-Cache-Reconcile Informer
//!
//! Keeps a local, eventually consistent mirror of a remote resource
//! collection and turns every change into exactly one handler callback.
//!
//! ## Architecture
//!
//! ```text
//! ResourceClient ─▶ Reflector ─▶ Store ─▶ Dispatcher ─▶ ResourceHandler
//!                        ▲
//!                 resync timer / backoff
//! ```
//!
//! - **Reflector**: initial list, then watch from the list's resource version;
//!   reopens ended watches, relists on an expired cursor or at the resync
//!   deadline
//! - **Store**: key → latest snapshot, swapped atomically on relist
//! - **Dispatcher**: `on_add` / `on_update` / `on_delete`, in store order,
//!   with handler errors and panics isolated
//! - **Controller**: the runnable unit tying the above together
//! - **Registrar**: idempotent schema bootstrap, run before any controller
//!
//! # Example
//!
//! ```no_run
//! use informer::{Controller, ResourceHandler};
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use resource_client::KubeResourceClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Log;
//!
//! #[async_trait::async_trait]
//! impl ResourceHandler<ConfigMap> for Log {
//!     async fn on_add(&self, obj: Arc<ConfigMap>) -> anyhow::Result<()> {
//!         println!("added {:?}", obj.metadata.name);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let controller = Controller::new(
//!     Arc::new(KubeResourceClient::<ConfigMap>::namespaced(client, "default")),
//!     None,
//!     Duration::from_secs(60),
//!     Arc::new(Log),
//! );
//! controller.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod bootstrap;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod reflector;
pub mod store;

pub use bootstrap::{Registrar, Registration};
pub use controller::{Controller, ControllerState, StateHandle};
pub use dispatcher::{Delivery, Dispatcher, Notification, ResourceHandler};
pub use error::InformerError;
pub use metrics::InformerMetrics;
pub use reflector::ReflectorConfig;
pub use store::{ObjectKey, Reader, ReplaceDelta, Store};
