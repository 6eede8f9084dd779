//! ServiceInstance handler
//!
//! Every resync re-delivers each instance as an update, so the handler tells
//! real changes apart from heartbeats by comparing the two snapshots.

use super::object_ref;
use crds::ServiceInstance;
use informer::ResourceHandler;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of comparing two snapshots of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceChange {
    /// Same spec, labels and annotations
    Unchanged,
    /// Something a user can see differs
    Changed,
}

impl InstanceChange {
    /// Compare the user-visible parts of two snapshots.
    pub fn between(old: &ServiceInstance, new: &ServiceInstance) -> Self {
        if old.spec == new.spec
            && old.metadata.labels == new.metadata.labels
            && old.metadata.annotations == new.metadata.annotations
        {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }
}

/// Logs instance lifecycle.
#[derive(Debug, Default)]
pub struct InstanceHandler;

#[async_trait::async_trait]
impl ResourceHandler<ServiceInstance> for InstanceHandler {
    async fn on_add(&self, instance: Arc<ServiceInstance>) -> anyhow::Result<()> {
        info!(
            instance = %object_ref(instance.as_ref()),
            broker = %instance.spec.broker,
            service_class = %instance.spec.service_class,
            plan = %instance.spec.plan,
            "instance added"
        );
        Ok(())
    }

    async fn on_update(&self, old: Arc<ServiceInstance>, new: Arc<ServiceInstance>) -> anyhow::Result<()> {
        let instance = object_ref(new.as_ref());
        let old_version = old.metadata.resource_version.as_deref().unwrap_or_default();
        let new_version = new.metadata.resource_version.as_deref().unwrap_or_default();
        match InstanceChange::between(&old, &new) {
            InstanceChange::Unchanged => {
                debug!(%instance, resource_version = new_version, "instance resynced, nothing changes");
            }
            InstanceChange::Changed => {
                info!(
                    %instance,
                    old_resource_version = old_version,
                    resource_version = new_version,
                    plan = %new.spec.plan,
                    "instance updated, something changes"
                );
            }
        }
        Ok(())
    }

    async fn on_delete(&self, instance: Arc<ServiceInstance>) -> anyhow::Result<()> {
        info!(instance = %object_ref(instance.as_ref()), broker = %instance.spec.broker, "instance deleted");
        Ok(())
    }
}
