//! Service Catalog CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the service catalog controllers,
//! and the schema descriptors the bootstrap registrar must confirm at startup.

pub mod service_broker;
pub mod service_instance;

pub use service_broker::*;
pub use service_instance::*;

use resource_client::SchemaDescriptor;

/// API group shared by every catalog CRD.
pub const CATALOG_GROUP: &str = "catalog.microscaler.io";

/// Description annotation of the ServiceBroker CRD.
pub const SERVICE_BROKER_DESCRIPTION: &str = "A service broker registered with the catalog";

/// Description annotation of the ServiceInstance CRD.
pub const SERVICE_INSTANCE_DESCRIPTION: &str = "A provisioned instance of a broker's service";

/// Schema descriptor of the ServiceBroker collection.
pub fn service_broker_descriptor() -> SchemaDescriptor {
    SchemaDescriptor::of::<ServiceBroker>(SERVICE_BROKER_DESCRIPTION)
}

/// Schema descriptor of the ServiceInstance collection.
pub fn service_instance_descriptor() -> SchemaDescriptor {
    SchemaDescriptor::of::<ServiceInstance>(SERVICE_INSTANCE_DESCRIPTION)
}

/// Schema descriptors for every catalog collection, in bootstrap order.
pub fn schema_descriptors() -> Vec<SchemaDescriptor> {
    vec![service_broker_descriptor(), service_instance_descriptor()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_qualified_by_group() {
        let names: Vec<String> = schema_descriptors()
            .iter()
            .map(SchemaDescriptor::qualified_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "servicebrokers.catalog.microscaler.io".to_string(),
                "serviceinstances.catalog.microscaler.io".to_string(),
            ]
        );
    }

    #[test]
    fn test_per_kind_descriptors_match_bootstrap_list() {
        let all = schema_descriptors();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, service_broker_descriptor().kind);
        assert_eq!(all[0].description, SERVICE_BROKER_DESCRIPTION);
        assert_eq!(all[1].kind, service_instance_descriptor().kind);
        assert_eq!(all[1].description, SERVICE_INSTANCE_DESCRIPTION);
    }

    #[test]
    fn test_definition_carries_description() {
        let descriptor = SchemaDescriptor::of::<ServiceBroker>("brokers");
        let crd = descriptor.definition();

        assert_eq!(crd.metadata.name.as_deref(), Some("servicebrokers.catalog.microscaler.io"));
        assert_eq!(crd.spec.group, CATALOG_GROUP);
        let annotations = crd.metadata.annotations.unwrap_or_default();
        assert_eq!(
            annotations.get("catalog.microscaler.io/description").map(String::as_str),
            Some("brokers")
        );
    }

    #[test]
    fn test_descriptor_fields() {
        let descriptor = SchemaDescriptor::of::<ServiceInstance>("instances");
        assert_eq!(descriptor.kind, "ServiceInstance");
        assert_eq!(descriptor.plural, "serviceinstances");
        assert_eq!(descriptor.version, "v1alpha1");
    }
}
