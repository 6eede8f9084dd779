//! Main controller implementation.
//!
//! Builds one informer controller per watched collection, bootstraps the
//! catalog schemas, then runs every controller and the probe server until
//! shutdown:
//!
//! - ServiceBrokers in the broker namespace
//! - ServiceInstances in one or all namespaces
//! - CustomResourceDefinitions (cluster scoped), seeding a broker if configured

use crate::config::Config;
use crate::error::ControllerError;
use crate::handlers::{BrokerHandler, InstanceHandler, SchemaHandler, SeedBroker};
use crate::probes::{self, Readiness};
use crds::{ServiceBroker, ServiceInstance, CATALOG_GROUP};
use informer::{Controller as Informer, InformerError, InformerMetrics, Registrar};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::Client;
use prometheus::Registry;
use resource_client::{KubeResourceClient, KubeSchemaClient, ResourceClient, SchemaDescriptor};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

type InformerTask = JoinHandle<Result<(), InformerError>>;

/// Main controller for the service catalog.
#[derive(Debug)]
pub struct Controller {
    cancel: CancellationToken,
    broker_informer: InformerTask,
    instance_informer: InformerTask,
    schema_informer: InformerTask,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Bootstrap schemas and start every informer.
    ///
    /// Fails if the catalog schemas cannot be confirmed; nothing is watched in
    /// that case.
    pub async fn new(config: Config, cancel: CancellationToken) -> Result<Self, ControllerError> {
        info!("Initializing Service Catalog Controller");

        let client = Client::try_default().await?;
        let registry = Registry::new();
        let metrics = InformerMetrics::register(&registry)?;

        let brokers = Arc::new(KubeResourceClient::<ServiceBroker>::namespaced(
            client.clone(),
            &config.broker_namespace,
        ));
        let instances = Arc::new(match &config.instance_namespace {
            Some(ns) => KubeResourceClient::<ServiceInstance>::namespaced(client.clone(), ns),
            None => KubeResourceClient::<ServiceInstance>::all(client.clone()),
        });
        let schemas = Arc::new(KubeResourceClient::<CustomResourceDefinition>::all(client.clone()));

        let seed = seed_broker(&config, &brokers);

        let broker_informer = Informer::<ServiceBroker>::new(
            brokers,
            crds::service_broker_descriptor(),
            config.broker_resync,
            Arc::new(BrokerHandler),
        )
        .with_backoff(config.backoff_min, config.backoff_max)
        .with_metrics(metrics.clone());
        let instance_informer = Informer::<ServiceInstance>::new(
            instances,
            crds::service_instance_descriptor(),
            config.instance_resync,
            Arc::new(InstanceHandler),
        )
        .with_backoff(config.backoff_min, config.backoff_max)
        .with_metrics(metrics.clone());
        let schema_informer = Informer::<CustomResourceDefinition>::new(
            schemas,
            None,
            config.schema_resync,
            Arc::new(SchemaHandler::new(CATALOG_GROUP, seed)),
        )
        .with_backoff(config.backoff_min, config.backoff_max)
        .with_metrics(metrics);

        // Probes come up first so liveness passes while bootstrap runs
        let readiness = Readiness::new(vec![
            broker_informer.state_handle(),
            instance_informer.state_handle(),
            schema_informer.state_handle(),
        ]);
        let probe_server = tokio::spawn(probes::serve(
            config.probe_addr,
            registry,
            readiness.clone(),
            cancel.clone(),
        ));

        let descriptors: Vec<SchemaDescriptor> = [
            broker_informer.schema(),
            instance_informer.schema(),
            schema_informer.schema(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        let registrar = Registrar::new(Arc::new(KubeSchemaClient::new(client)));
        for (name, outcome) in registrar.ensure_all(&descriptors).await? {
            info!(schema = %name, outcome = ?outcome, "schema confirmed");
        }
        readiness.mark_bootstrapped();

        Ok(Self {
            broker_informer: spawn_informer(broker_informer, &cancel),
            instance_informer: spawn_informer(instance_informer, &cancel),
            schema_informer: spawn_informer(schema_informer, &cancel),
            probe_server,
            cancel,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Service Catalog Controller running");

        // Informers only return once cancelled; anything earlier is a failure
        tokio::select! {
            result = &mut self.broker_informer => return exited("ServiceBroker informer", result),
            result = &mut self.instance_informer => return exited("ServiceInstance informer", result),
            result = &mut self.schema_informer => return exited("CRD informer", result),
            result = &mut self.probe_server => {
                let result = result
                    .map_err(|e| ControllerError::Watch(format!("probe server panicked: {e}")))?;
                result?;
                return Err(ControllerError::Watch("probe server stopped".to_string()));
            }
            () = self.cancel.cancelled() => {}
        }

        info!("Shutting down, waiting for informers to stop");
        let (brokers, instances, schemas, probe) = tokio::join!(
            self.broker_informer,
            self.instance_informer,
            self.schema_informer,
            self.probe_server,
        );
        for (what, result) in [
            ("ServiceBroker informer", brokers),
            ("ServiceInstance informer", instances),
            ("CRD informer", schemas),
        ] {
            result
                .map_err(|e| ControllerError::Watch(format!("{what} panicked: {e}")))?
                .map_err(|e| ControllerError::Watch(format!("{what} error: {e}")))?;
        }
        probe.map_err(|e| ControllerError::Watch(format!("probe server panicked: {e}")))??;

        info!("Service Catalog Controller stopped");
        Ok(())
    }
}

/// The configured seed broker, created through the broker collection's client.
fn seed_broker<C>(config: &Config, brokers: &Arc<C>) -> Option<SeedBroker>
where
    C: ResourceClient<ServiceBroker> + 'static,
{
    config.seed_broker_name.as_ref().map(|name| {
        SeedBroker::new(brokers.clone(), name.clone(), config.broker_namespace.clone())
    })
}

fn spawn_informer<K>(informer: Informer<K>, cancel: &CancellationToken) -> InformerTask
where
    K: kube::Resource + Clone + Send + Sync + 'static,
{
    let cancel = cancel.clone();
    tokio::spawn(async move { informer.run(cancel).await })
}

fn exited(
    what: &str,
    result: Result<Result<(), InformerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{what} panicked: {e}")))?
        .map_err(|e| ControllerError::Watch(format!("{what} error: {e}")))?;
    Err(ControllerError::Watch(format!("{what} exited before shutdown")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_client::{MockCall, MockResourceClient};

    fn config_with_seed(seed: Option<&str>) -> Config {
        Config::from_lookup(|key| match key {
            "BROKER_NAMESPACE" => Some("catalog".to_string()),
            "SEED_BROKER_NAME" => seed.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_no_seed_without_name() {
        let brokers = Arc::new(MockResourceClient::<ServiceBroker>::new("servicebrokers"));
        assert!(seed_broker(&config_with_seed(None), &brokers).is_none());
    }

    #[tokio::test]
    async fn test_seed_uses_broker_client_and_namespace() {
        let brokers = Arc::new(MockResourceClient::<ServiceBroker>::new("servicebrokers"));
        let seed = seed_broker(&config_with_seed(Some("example1")), &brokers).unwrap();

        assert!(seed.ensure().await.unwrap());
        assert!(brokers.has_object("example1"));
        assert_eq!(
            brokers.calls(),
            vec![
                MockCall::Get {
                    name: "example1".to_string()
                },
                MockCall::Create {
                    name: "example1".to_string()
                },
            ]
        );
    }
}
