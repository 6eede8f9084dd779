//! CustomResourceDefinition handler
//!
//! Reports catalog CRDs as they appear and change. When a seed broker is
//! configured, every sighting of the ServiceBroker CRD makes sure that broker
//! exists (get, then create if missing), so a fresh cluster ends up with one
//! usable broker without manual steps.

use super::object_ref;
use crds::{ServiceBroker, ServiceBrokerSpec};
use informer::ResourceHandler;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Resource;
use resource_client::ResourceClient;
use std::sync::Arc;
use tracing::{debug, info};

/// The ServiceBroker that must exist once its CRD is served.
pub struct SeedBroker {
    client: Arc<dyn ResourceClient<ServiceBroker>>,
    name: String,
    namespace: String,
}

impl std::fmt::Debug for SeedBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedBroker")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl SeedBroker {
    /// Seed `name` in `namespace` through `client`.
    pub fn new(
        client: Arc<dyn ResourceClient<ServiceBroker>>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    fn object(&self) -> ServiceBroker {
        let mut broker = ServiceBroker::new(
            &self.name,
            ServiceBrokerSpec {
                url: format!("http://{}.{}.svc.cluster.local", self.name, self.namespace),
                username: None,
                password: None,
            },
        );
        broker.metadata.namespace = Some(self.namespace.clone());
        broker
    }

    /// Create the broker unless it already exists.
    ///
    /// Returns `true` if this call created it.
    pub async fn ensure(&self) -> anyhow::Result<bool> {
        match self.client.get(&self.name).await {
            Ok(existing) => {
                debug!(broker = %object_ref(&existing), "seed broker present");
                return Ok(false);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        match self.client.create(&self.object()).await {
            Ok(created) => {
                info!(broker = %object_ref(&created), url = %created.spec.url, "seed broker created");
                Ok(true)
            }
            Err(err) if err.is_already_exists() => {
                debug!(broker = %self.name, "seed broker created concurrently");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Watches CRDs, reporting the ones in the catalog group.
#[derive(Debug)]
pub struct SchemaHandler {
    group: String,
    seed: Option<SeedBroker>,
}

impl SchemaHandler {
    /// Report CRDs belonging to `group`, optionally seeding a broker.
    pub fn new(group: impl Into<String>, seed: Option<SeedBroker>) -> Self {
        Self {
            group: group.into(),
            seed,
        }
    }

    fn is_catalog(&self, crd: &CustomResourceDefinition) -> bool {
        crd.spec.group == self.group
    }

    fn is_broker_schema(&self, crd: &CustomResourceDefinition) -> bool {
        self.is_catalog(crd) && crd.spec.names.plural == ServiceBroker::plural(&())
    }

    async fn observe(&self, crd: &CustomResourceDefinition, action: &str) -> anyhow::Result<()> {
        if !self.is_catalog(crd) {
            return Ok(());
        }
        let versions: Vec<&str> = crd.spec.versions.iter().map(|v| v.name.as_str()).collect();
        let description = crd
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&format!("{}/description", self.group)))
            .map_or("", String::as_str);
        debug!(
            schema = %object_ref(crd),
            kind = %crd.spec.names.kind,
            versions = ?versions,
            description,
            "catalog schema {action}"
        );

        if let Some(seed) = &self.seed {
            if self.is_broker_schema(crd) {
                seed.ensure().await?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceHandler<CustomResourceDefinition> for SchemaHandler {
    async fn on_add(&self, crd: Arc<CustomResourceDefinition>) -> anyhow::Result<()> {
        self.observe(&crd, "added").await
    }

    async fn on_update(
        &self,
        _old: Arc<CustomResourceDefinition>,
        new: Arc<CustomResourceDefinition>,
    ) -> anyhow::Result<()> {
        self.observe(&new, "seen").await
    }

    async fn on_delete(&self, crd: Arc<CustomResourceDefinition>) -> anyhow::Result<()> {
        if self.is_catalog(&crd) {
            info!(schema = %object_ref(crd.as_ref()), "catalog schema deleted");
        }
        Ok(())
    }
}
