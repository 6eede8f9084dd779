//! ServiceInstance CRD
//!
//! Requests a provisioned instance of a service class from a broker.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "catalog.microscaler.io",
    version = "v1alpha1",
    kind = "ServiceInstance",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceSpec {
    /// Name of the ServiceBroker offering the service
    pub broker: String,

    /// Service class offered by the broker
    pub service_class: String,

    /// Plan within the service class
    #[serde(default)]
    pub plan: String,

    /// Provisioning parameters passed to the broker
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}
