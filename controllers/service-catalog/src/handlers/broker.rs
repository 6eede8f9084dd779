//! ServiceBroker handler

use super::object_ref;
use crds::ServiceBroker;
use informer::ResourceHandler;
use std::sync::Arc;
use tracing::info;

/// Logs broker registrations. Passwords never reach the log.
#[derive(Debug, Default)]
pub struct BrokerHandler;

/// Log-safe rendering of an optional secret.
pub(crate) fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

#[async_trait::async_trait]
impl ResourceHandler<ServiceBroker> for BrokerHandler {
    async fn on_add(&self, broker: Arc<ServiceBroker>) -> anyhow::Result<()> {
        info!(
            broker = %object_ref(broker.as_ref()),
            url = %broker.spec.url,
            username = broker.spec.username.as_deref().unwrap_or("<unset>"),
            password = redact(broker.spec.password.as_deref()),
            "broker added"
        );
        Ok(())
    }

    async fn on_update(&self, old: Arc<ServiceBroker>, new: Arc<ServiceBroker>) -> anyhow::Result<()> {
        info!(
            broker = %object_ref(new.as_ref()),
            url = %new.spec.url,
            old_url = %old.spec.url,
            username = new.spec.username.as_deref().unwrap_or("<unset>"),
            password = redact(new.spec.password.as_deref()),
            password_changed = old.spec.password != new.spec.password,
            "broker updated"
        );
        Ok(())
    }

    async fn on_delete(&self, broker: Arc<ServiceBroker>) -> anyhow::Result<()> {
        info!(broker = %object_ref(broker.as_ref()), url = %broker.spec.url, "broker deleted");
        Ok(())
    }
}
