//! Client traits for mocking
//!
//! The informer only talks to the API server through these traits, so unit
//! tests can substitute the scripted mocks from the `test-util` feature.

use crate::error::ClientError;
use crate::models::{ListPage, WatchStream};
use crate::schema::SchemaDescriptor;

/// Operations on one resource collection.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceClient<K>: Send + Sync
where
    K: Clone + Send + Sync + 'static,
{
    /// Collection name used in logs and metric labels (e.g. `servicebrokers`)
    fn collection(&self) -> &str;

    /// List every object in scope along with the collection resource version.
    async fn list(&self) -> Result<ListPage<K>, ClientError>;

    /// Open a watch starting after `since`.
    async fn watch(&self, since: &str) -> Result<WatchStream<K>, ClientError>;

    /// Fetch one object by name.
    async fn get(&self, name: &str) -> Result<K, ClientError>;

    /// Create an object, failing with `AlreadyExists` if the name is taken.
    async fn create(&self, object: &K) -> Result<K, ClientError>;
}

/// Operations on schema definitions, addressed by qualified name.
#[async_trait::async_trait]
pub trait SchemaClient: Send + Sync {
    /// Succeeds if the schema exists, `NotFound` otherwise.
    async fn get_schema(&self, name: &str) -> Result<(), ClientError>;

    /// Create the schema described by `descriptor`.
    async fn create_schema(&self, descriptor: &SchemaDescriptor) -> Result<(), ClientError>;
}
