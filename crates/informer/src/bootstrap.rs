//! Idempotent schema bring-up, run once before any controller starts.

use crate::error::InformerError;
use resource_client::{SchemaClient, SchemaDescriptor};
use std::sync::Arc;
use tracing::{debug, info};

/// How a schema was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// It already existed
    AlreadyPresent,
    /// This registrar created it
    Created,
    /// Someone else created it between our get and create
    CreatedConcurrently,
}

/// Ensures schema definitions exist.
pub struct Registrar {
    client: Arc<dyn SchemaClient>,
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar").finish_non_exhaustive()
    }
}

impl Registrar {
    /// Create a registrar backed by `client`.
    pub fn new(client: Arc<dyn SchemaClient>) -> Self {
        Self { client }
    }

    /// Get the schema by qualified name, creating it if absent.
    ///
    /// # Errors
    ///
    /// [`InformerError::SchemaConfirmation`] for anything other than
    /// `NotFound` on get or `AlreadyExists` on create.
    pub async fn ensure(&self, descriptor: &SchemaDescriptor) -> Result<Registration, InformerError> {
        let name = descriptor.qualified_name();
        let confirmation = |source| InformerError::SchemaConfirmation {
            name: name.clone(),
            source,
        };

        match self.client.get_schema(&name).await {
            Ok(()) => {
                debug!(schema = %name, "schema already present");
                return Ok(Registration::AlreadyPresent);
            }
            Err(err) if err.is_not_found() => {
                debug!(schema = %name, "schema not found, creating");
            }
            Err(err) => return Err(confirmation(err)),
        }

        match self.client.create_schema(descriptor).await {
            Ok(()) => {
                info!(schema = %name, version = %descriptor.version, "schema created");
                Ok(Registration::Created)
            }
            Err(err) if err.is_already_exists() => {
                info!(schema = %name, "schema created concurrently");
                Ok(Registration::CreatedConcurrently)
            }
            Err(err) => Err(confirmation(err)),
        }
    }

    /// Ensure every descriptor in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first [`InformerError::SchemaConfirmation`] encountered.
    pub async fn ensure_all(
        &self,
        descriptors: &[SchemaDescriptor],
    ) -> Result<Vec<(String, Registration)>, InformerError> {
        let mut outcomes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let outcome = self.ensure(descriptor).await?;
            outcomes.push((descriptor.qualified_name(), outcome));
        }
        Ok(outcomes)
    }
}
