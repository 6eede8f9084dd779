//! Mock clients for unit testing
//!
//! [`MockResourceClient`] replays scripted list and watch responses and keeps
//! a log of every call (with the tokio clock time it was made, so paused-time
//! tests can assert on scheduling). [`MockSchemaClient`] keeps schema names in
//! memory and can be told to fail.
//!
//! - `schema.rs` - schema client mock

mod schema;

pub use schema::MockSchemaClient;

use crate::client_trait::ResourceClient;
use crate::error::ClientError;
use crate::models::{ListPage, WatchEvent, WatchStream};
use futures::StreamExt;
use kube::Resource;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// A call observed by [`MockResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// `list()`
    List,
    /// `watch(since)`
    Watch {
        /// Cursor the watch was opened from
        since: String,
    },
    /// `get(name)`
    Get {
        /// Requested name
        name: String,
    },
    /// `create(object)`
    Create {
        /// Name of the submitted object
        name: String,
    },
}

/// Scripted response to one `watch()` call.
#[derive(Debug)]
pub enum WatchScript<K> {
    /// Deliver the items, then end the stream
    Ends(Vec<Result<WatchEvent<K>, ClientError>>),
    /// Deliver the items, then end the stream once the delay has passed
    EndsAfter(Duration, Vec<Result<WatchEvent<K>, ClientError>>),
    /// Deliver the items, then stay open until dropped
    Hangs(Vec<Result<WatchEvent<K>, ClientError>>),
    /// Fail to open the watch
    Fails(ClientError),
}

/// Mock resource client for testing
///
/// Unscripted list calls fail with `Unavailable`; unscripted watch calls
/// return a stream that never yields.
#[derive(Clone)]
pub struct MockResourceClient<K> {
    pub(crate) collection: String,
    pub(crate) lists: Arc<Mutex<VecDeque<Result<ListPage<K>, ClientError>>>>,
    pub(crate) watches: Arc<Mutex<VecDeque<WatchScript<K>>>>,
    pub(crate) objects: Arc<Mutex<BTreeMap<String, K>>>,
    pub(crate) get_failures: Arc<Mutex<VecDeque<ClientError>>>,
    pub(crate) calls: Arc<Mutex<Vec<(MockCall, Instant)>>>,
}

impl<K> MockResourceClient<K> {
    /// Create a new mock client
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            lists: Arc::new(Mutex::new(VecDeque::new())),
            watches: Arc::new(Mutex::new(VecDeque::new())),
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            get_failures: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful list response
    pub fn push_list(&self, items: Vec<K>, resource_version: &str) {
        self.lists
            .lock()
            .unwrap()
            .push_back(Ok(ListPage::new(items, resource_version)));
    }

    /// Queue a failed list response
    pub fn push_list_error(&self, err: ClientError) {
        self.lists.lock().unwrap().push_back(Err(err));
    }

    /// Queue a watch response
    pub fn push_watch(&self, script: WatchScript<K>) {
        self.watches.lock().unwrap().push_back(script);
    }

    /// Add an object to the get/create store (for test setup)
    pub fn insert_object(&self, name: &str, object: K) {
        self.objects.lock().unwrap().insert(name.to_string(), object);
    }

    /// Make the next `get()` fail with `err`
    pub fn fail_next_get(&self, err: ClientError) {
        self.get_failures.lock().unwrap().push_back(err);
    }

    /// Whether an object with this name exists in the get/create store
    pub fn has_object(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().iter().map(|(call, _)| call.clone()).collect()
    }

    /// All calls made so far with the (tokio) time they were made
    pub fn timed_calls(&self) -> Vec<(MockCall, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `list()` calls made so far
    pub fn list_count(&self) -> usize {
        self.calls().iter().filter(|call| **call == MockCall::List).count()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

#[async_trait::async_trait]
impl<K> ResourceClient<K> for MockResourceClient<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list(&self) -> Result<ListPage<K>, ClientError> {
        self.record(MockCall::List);
        self.lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Unavailable("no scripted list response".to_string())))
    }

    async fn watch(&self, since: &str) -> Result<WatchStream<K>, ClientError> {
        self.record(MockCall::Watch {
            since: since.to_string(),
        });
        let script = self.watches.lock().unwrap().pop_front();
        match script {
            Some(WatchScript::Ends(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(WatchScript::EndsAfter(delay, items)) => Ok(futures::stream::iter(items)
                .chain(
                    futures::stream::once(tokio::time::sleep(delay))
                        .filter_map(|()| async { None::<Result<WatchEvent<K>, ClientError>> }),
                )
                .boxed()),
            Some(WatchScript::Hangs(items)) => Ok(futures::stream::iter(items)
                .chain(futures::stream::pending())
                .boxed()),
            Some(WatchScript::Fails(err)) => Err(err),
            None => Ok(futures::stream::pending().boxed()),
        }
    }

    async fn get(&self, name: &str) -> Result<K, ClientError> {
        self.record(MockCall::Get {
            name: name.to_string(),
        });
        if let Some(err) = self.get_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("{} {} not found", self.collection, name)))
    }

    async fn create(&self, object: &K) -> Result<K, ClientError> {
        let name = object.meta().name.clone().unwrap_or_default();
        self.record(MockCall::Create { name: name.clone() });
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&name) {
            return Err(ClientError::AlreadyExists(format!(
                "{} {} already exists",
                self.collection, name
            )));
        }
        objects.insert(name, object.clone());
        Ok(object.clone())
    }
}
