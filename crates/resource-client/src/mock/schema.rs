//! Schema client mock

use crate::client_trait::SchemaClient;
use crate::error::ClientError;
use crate::schema::SchemaDescriptor;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock schema client
///
/// `get_schema` checks existence and then yields before answering, so two
/// registrars joined on one task both observe `NotFound` and race on create.
#[derive(Clone, Default)]
pub struct MockSchemaClient {
    pub(crate) schemas: Arc<Mutex<BTreeMap<String, SchemaDescriptor>>>,
    pub(crate) get_failures: Arc<Mutex<VecDeque<ClientError>>>,
    pub(crate) create_failures: Arc<Mutex<VecDeque<ClientError>>>,
    pub(crate) create_calls: Arc<AtomicUsize>,
}

impl MockSchemaClient {
    /// Create a new, empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a schema already exists (for test setup)
    pub fn add_schema(&self, descriptor: SchemaDescriptor) {
        self.schemas
            .lock()
            .unwrap()
            .insert(descriptor.qualified_name(), descriptor);
    }

    /// Make the next `get_schema` fail with `err`
    pub fn fail_next_get(&self, err: ClientError) {
        self.get_failures.lock().unwrap().push_back(err);
    }

    /// Make the next `create_schema` fail with `err`
    pub fn fail_next_create(&self, err: ClientError) {
        self.create_failures.lock().unwrap().push_back(err);
    }

    /// Names of all existing schemas
    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.lock().unwrap().keys().cloned().collect()
    }

    /// Number of `create_schema` calls made so far
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SchemaClient for MockSchemaClient {
    async fn get_schema(&self, name: &str) -> Result<(), ClientError> {
        let injected = self.get_failures.lock().unwrap().pop_front();
        let exists = self.schemas.lock().unwrap().contains_key(name);
        tokio::task::yield_now().await;
        if let Some(err) = injected {
            return Err(err);
        }
        if exists {
            Ok(())
        } else {
            Err(ClientError::NotFound(format!("schema {name} not found")))
        }
    }

    async fn create_schema(&self, descriptor: &SchemaDescriptor) -> Result<(), ClientError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.create_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let name = descriptor.qualified_name();
        let mut schemas = self.schemas.lock().unwrap();
        if schemas.contains_key(&name) {
            return Err(ClientError::AlreadyExists(format!("schema {name} already exists")));
        }
        schemas.insert(name, descriptor.clone());
        Ok(())
    }
}
