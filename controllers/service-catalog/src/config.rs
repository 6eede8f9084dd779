//! Environment-driven configuration.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Namespace watched for ServiceBrokers (`BROKER_NAMESPACE`)
    pub broker_namespace: String,
    /// Namespace watched for ServiceInstances; `None` = all (`INSTANCE_NAMESPACE`)
    pub instance_namespace: Option<String>,
    /// Broker resync interval (`BROKER_RESYNC_SECS`)
    pub broker_resync: Duration,
    /// Instance resync interval (`INSTANCE_RESYNC_SECS`)
    pub instance_resync: Duration,
    /// CRD resync interval (`SCHEMA_RESYNC_SECS`)
    pub schema_resync: Duration,
    /// First retry delay (`BACKOFF_MIN_MILLIS`)
    pub backoff_min: Duration,
    /// Retry delay cap (`BACKOFF_MAX_SECS`)
    pub backoff_max: Duration,
    /// Probe and metrics listen address (`PROBE_ADDR`)
    pub probe_addr: SocketAddr,
    /// ServiceBroker to create once the catalog CRDs exist (`SEED_BROKER_NAME`)
    pub seed_broker_name: Option<String>,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            broker_namespace: get("BROKER_NAMESPACE").unwrap_or_else(|| "default".to_string()),
            instance_namespace: get("INSTANCE_NAMESPACE"),
            broker_resync: Duration::from_secs(parse_or(get("BROKER_RESYNC_SECS"), "BROKER_RESYNC_SECS", 300)?),
            instance_resync: Duration::from_secs(parse_or(
                get("INSTANCE_RESYNC_SECS"),
                "INSTANCE_RESYNC_SECS",
                120,
            )?),
            schema_resync: Duration::from_secs(parse_or(get("SCHEMA_RESYNC_SECS"), "SCHEMA_RESYNC_SECS", 10)?),
            backoff_min: Duration::from_millis(parse_or(get("BACKOFF_MIN_MILLIS"), "BACKOFF_MIN_MILLIS", 500)?),
            backoff_max: Duration::from_secs(parse_or(get("BACKOFF_MAX_SECS"), "BACKOFF_MAX_SECS", 30)?),
            probe_addr: parse_or(
                get("PROBE_ADDR"),
                "PROBE_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8080)),
            )?,
            seed_broker_name: get("SEED_BROKER_NAME"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        for (key, interval) in [
            ("BROKER_RESYNC_SECS", self.broker_resync),
            ("INSTANCE_RESYNC_SECS", self.instance_resync),
            ("SCHEMA_RESYNC_SECS", self.schema_resync),
        ] {
            if interval.is_zero() {
                return Err(ControllerError::InvalidConfig(format!("{key} must be greater than zero")));
            }
        }
        if self.backoff_min.is_zero() || self.backoff_min > self.backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff bounds must satisfy 0 < min <= max (got {:?}..{:?})",
                self.backoff_min, self.backoff_max
            )));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ControllerError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ControllerError::InvalidConfig(format!("{key} has invalid value {raw:?}"))),
    }
}
