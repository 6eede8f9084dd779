//! Business handlers for the catalog collections.
//!
//! - `broker.rs` - ServiceBroker logging (credentials redacted)
//! - `instance.rs` - ServiceInstance logging and change detection
//! - `schema.rs` - CRD logging and seed broker creation

mod broker;
mod instance;
mod schema;

pub use broker::BrokerHandler;
pub use instance::InstanceHandler;
pub use schema::{SchemaHandler, SeedBroker};

use kube::ResourceExt;

/// `namespace/name` of an object, for log fields.
pub(crate) fn object_ref<K: ResourceExt>(obj: &K) -> String {
    match obj.namespace() {
        Some(ns) => format!("{}/{}", ns, obj.name_any()),
        None => obj.name_any(),
    }
}
