//! ServiceBroker CRD
//!
//! Registers an external service broker endpoint with the catalog.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "catalog.microscaler.io",
    version = "v1alpha1",
    kind = "ServiceBroker",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBrokerSpec {
    /// Broker API endpoint
    pub url: String,

    /// Basic auth username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic auth password (never logged)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ServiceBrokerSpec {
    /// Whether basic auth credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: ServiceBrokerSpec = serde_json::from_value(serde_json::json!({
            "url": "http://broker.svc:8080",
            "username": "admin",
            "password": "s3cret",
        }))
        .unwrap();

        assert_eq!(spec.url, "http://broker.svc:8080");
        assert!(spec.has_credentials());
    }

    #[test]
    fn test_credentials_optional() {
        let spec: ServiceBrokerSpec =
            serde_json::from_value(serde_json::json!({ "url": "http://broker" })).unwrap();
        assert!(!spec.has_credentials());
        assert!(!serde_json::to_string(&spec).unwrap().contains("password"));
    }
}
