//! Resource Collection Client
//!
//! Typed list/watch/get/create access to a single Kubernetes resource
//! collection, plus get/create access to schema definitions
//! (CustomResourceDefinitions).
//!
//! The informer crate only depends on the [`ResourceClient`] and
//! [`SchemaClient`] traits; [`KubeResourceClient`] and [`KubeSchemaClient`]
//! implement them against a live API server, and the `test-util` feature adds
//! scripted in-memory mocks.
//!
//! # Example
//!
//! ```no_run
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use resource_client::{KubeResourceClient, ResourceClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let config_maps = KubeResourceClient::<ConfigMap>::namespaced(client, "default");
//!
//! let page = config_maps.list().await?;
//! println!("{} items at version {}", page.items.len(), page.resource_version);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod schema;
#[path = "trait.rs"]
pub mod client_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{KubeResourceClient, KubeSchemaClient};
pub use client_trait::{ResourceClient, SchemaClient};
pub use error::ClientError;
pub use models::{ListPage, WatchEvent, WatchStream};
pub use schema::SchemaDescriptor;
#[cfg(feature = "test-util")]
pub use mock::{MockCall, MockResourceClient, MockSchemaClient, WatchScript};
