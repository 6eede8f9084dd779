//! Kubernetes-backed clients
//!
//! Thin adapters from `kube::Api` onto the [`ResourceClient`] and
//! [`SchemaClient`] contracts. Status codes are classified by
//! [`ClientError::from_status`]: 404 → `NotFound`, 409 → `AlreadyExists`,
//! 410 → `CursorExpired`, 429/5xx → `Unavailable`.

use crate::client_trait::{ResourceClient, SchemaClient};
use crate::error::ClientError;
use crate::models::{ListPage, WatchEvent, WatchStream};
use crate::schema::SchemaDescriptor;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, ListParams, PostParams, WatchParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Server-side watch timeout; the server closes the stream after this long.
const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 290;

/// Resource client for one typed collection.
#[derive(Clone)]
pub struct KubeResourceClient<K> {
    api: Api<K>,
    collection: String,
    watch_timeout_secs: u32,
}

impl<K> KubeResourceClient<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    /// Client scoped to one namespace.
    pub fn namespaced(client: Client, namespace: &str) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self::from_api(Api::namespaced(client, namespace))
    }

    /// Client over every namespace (or a cluster-scoped collection).
    pub fn all(client: Client) -> Self {
        Self::from_api(Api::all(client))
    }

    fn from_api(api: Api<K>) -> Self {
        Self {
            api,
            collection: K::plural(&()).into_owned(),
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
        }
    }

    /// Override the server-side watch timeout.
    #[must_use]
    pub fn with_watch_timeout(mut self, secs: u32) -> Self {
        self.watch_timeout_secs = secs;
        self
    }
}

#[async_trait::async_trait]
impl<K> ResourceClient<K> for KubeResourceClient<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn list(&self) -> Result<ListPage<K>, ClientError> {
        let list = self.api.list(&ListParams::default()).await?;
        let resource_version = list.metadata.resource_version.unwrap_or_default();
        debug!(collection = %self.collection, items = list.items.len(), %resource_version, "listed");
        Ok(ListPage::new(list.items, resource_version))
    }

    async fn watch(&self, since: &str) -> Result<WatchStream<K>, ClientError> {
        let api = self.api.clone();
        let params = WatchParams::default().timeout(self.watch_timeout_secs);
        let since = since.to_string();

        // The kube stream borrows its Api; own both inside the generator so the
        // returned stream is 'static. A failure to open arrives as the first item.
        let stream = async_stream::stream! {
            match api.watch(&params, &since).await {
                Ok(events) => {
                    let mut events = std::pin::pin!(events);
                    while let Some(event) = events.next().await {
                        yield event.map(WatchEvent::from).map_err(ClientError::from);
                    }
                }
                Err(err) => yield Err(ClientError::from(err)),
            }
        };

        Ok(stream.boxed())
    }

    async fn get(&self, name: &str) -> Result<K, ClientError> {
        Ok(self.api.get(name).await?)
    }

    async fn create(&self, object: &K) -> Result<K, ClientError> {
        Ok(self.api.create(&PostParams::default(), object).await?)
    }
}

/// Schema client over `CustomResourceDefinition` objects.
#[derive(Clone)]
pub struct KubeSchemaClient {
    api: Api<CustomResourceDefinition>,
}

impl KubeSchemaClient {
    /// Create a schema client.
    pub fn new(client: Client) -> Self {
        Self { api: Api::all(client) }
    }
}

#[async_trait::async_trait]
impl SchemaClient for KubeSchemaClient {
    async fn get_schema(&self, name: &str) -> Result<(), ClientError> {
        self.api.get(name).await?;
        Ok(())
    }

    async fn create_schema(&self, descriptor: &SchemaDescriptor) -> Result<(), ClientError> {
        self.api
            .create(&PostParams::default(), &descriptor.definition())
            .await?;
        Ok(())
    }
}
