//! Schema bootstrap against the in-memory schema client.

use crds::{ServiceBroker, ServiceInstance};
use informer::{InformerError, Registrar, Registration};
use resource_client::{ClientError, MockSchemaClient, SchemaDescriptor};
use std::sync::Arc;

fn broker_schema() -> SchemaDescriptor {
    SchemaDescriptor::of::<ServiceBroker>("Service brokers offering catalog services")
}

fn instance_schema() -> SchemaDescriptor {
    SchemaDescriptor::of::<ServiceInstance>("Provisioned service instances")
}

#[tokio::test]
async fn test_creates_missing_schema() {
    let client = MockSchemaClient::new();
    let registrar = Registrar::new(Arc::new(client.clone()));

    let outcome = registrar.ensure(&broker_schema()).await.unwrap();

    assert_eq!(outcome, Registration::Created);
    assert_eq!(
        client.schema_names(),
        vec!["servicebrokers.catalog.microscaler.io".to_string()]
    );
}

#[tokio::test]
async fn test_existing_schema_is_left_alone() {
    let client = MockSchemaClient::new();
    client.add_schema(broker_schema());
    let registrar = Registrar::new(Arc::new(client.clone()));

    let outcome = registrar.ensure(&broker_schema()).await.unwrap();

    assert_eq!(outcome, Registration::AlreadyPresent);
    assert_eq!(client.create_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_registrars_both_succeed() {
    let client = MockSchemaClient::new();
    let first = Registrar::new(Arc::new(client.clone()));
    let second = Registrar::new(Arc::new(client.clone()));
    let descriptor = broker_schema();

    let (a, b) = tokio::join!(first.ensure(&descriptor), second.ensure(&descriptor));

    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| format!("{o:?}"));
    assert_eq!(
        outcomes,
        vec![Registration::Created, Registration::CreatedConcurrently]
    );
    assert_eq!(client.schema_names().len(), 1);
    assert_eq!(client.create_calls(), 2);
}

#[tokio::test]
async fn test_create_race_reported_by_server_is_success() {
    let client = MockSchemaClient::new();
    client.fail_next_create(ClientError::from_status(409, "already exists"));
    let registrar = Registrar::new(Arc::new(client));

    let outcome = registrar.ensure(&broker_schema()).await.unwrap();

    assert_eq!(outcome, Registration::CreatedConcurrently);
}

#[tokio::test]
async fn test_get_failure_is_fatal() {
    let client = MockSchemaClient::new();
    client.fail_next_get(ClientError::from_status(403, "forbidden"));
    let registrar = Registrar::new(Arc::new(client.clone()));

    let err = registrar.ensure(&broker_schema()).await.unwrap_err();

    match err {
        InformerError::SchemaConfirmation { name, source } => {
            assert_eq!(name, "servicebrokers.catalog.microscaler.io");
            assert!(matches!(source, ClientError::Api { code: 403, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.create_calls(), 0);
}

#[tokio::test]
async fn test_create_failure_is_fatal() {
    let client = MockSchemaClient::new();
    client.fail_next_create(ClientError::Unavailable("connection refused".to_string()));
    let registrar = Registrar::new(Arc::new(client.clone()));

    let err = registrar.ensure(&broker_schema()).await.unwrap_err();

    assert!(matches!(err, InformerError::SchemaConfirmation { .. }));
    assert!(client.schema_names().is_empty());
}

#[tokio::test]
async fn test_ensure_all_reports_each_descriptor() {
    let client = MockSchemaClient::new();
    client.add_schema(instance_schema());
    let registrar = Registrar::new(Arc::new(client.clone()));

    let outcomes = registrar
        .ensure_all(&[broker_schema(), instance_schema()])
        .await
        .unwrap();

    assert_eq!(
        outcomes,
        vec![
            (
                "servicebrokers.catalog.microscaler.io".to_string(),
                Registration::Created
            ),
            (
                "serviceinstances.catalog.microscaler.io".to_string(),
                Registration::AlreadyPresent
            ),
        ]
    );
}

#[tokio::test]
async fn test_ensure_all_stops_at_first_failure() {
    let client = MockSchemaClient::new();
    client.fail_next_get(ClientError::from_status(401, "unauthorized"));
    let registrar = Registrar::new(Arc::new(client.clone()));

    let result = registrar
        .ensure_all(&[broker_schema(), instance_schema()])
        .await;

    assert!(result.is_err());
    assert_eq!(client.create_calls(), 0);
}
