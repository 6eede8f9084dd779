//! Controller-specific error types.
//!
//! Only startup failures end up here: steady-state list/watch and handler
//! failures are absorbed inside each informer.

use informer::InformerError;
use kube::Error as KubeError;
use resource_client::ClientError;
use thiserror::Error;

/// Errors that can occur in the Service Catalog Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client construction failed
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Resource client error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Informer error (schema bootstrap)
    #[error("Informer error: {0}")]
    Informer(#[from] InformerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Probe server failed to bind or serve
    #[error("Probe server error: {0}")]
    Probe(#[from] std::io::Error),

    /// A controller task exited before shutdown
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
