//! Configuration schema types.
//!
//! The on-disk format is a TOML file whose `[Core]` table carries the
//! flat, INI-style keys the broker has always been configured with
//! (`Name`, `Port`, `SeedServer`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level broker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// The `[Core]` section
    #[serde(rename = "Core")]
    pub core: CoreConfig,
}

impl BrokerConfig {
    /// Validate the whole configuration.
    ///
    /// # Errors
    /// Returns `Configuration` on the first invalid setting.
    pub fn validate(&self) -> crate::Result<()> {
        self.core.validate()
    }
}

/// The `[Core]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CoreConfig {
    /// This node's member name; must be unique within the cluster
    pub name: String,

    /// Gossip bind port
    pub port: u16,

    /// Seed member host for joining the cluster
    pub seed_server: String,

    /// Seed member gossip port
    pub seed_port: u16,

    /// HTTP API bind port
    pub http_port: u16,

    /// Expected cluster ring size
    pub ring_size: u32,

    /// Default visibility timeout, in seconds, for new queues
    pub visibility: f64,

    /// Config sync loop interval, in milliseconds
    pub sync_config_interval: u64,

    /// Log level (`trace`, `debug`, `info`, `warn`, `error`)
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            name: "veloq-1".to_string(),
            port: 7946,
            seed_server: String::new(),
            seed_port: 7946,
            http_port: 8081,
            ring_size: 1,
            visibility: 30.0,
            sync_config_interval: 5_000,
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Validate the section.
    ///
    /// # Errors
    /// Returns `Configuration` on the first invalid setting.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::Configuration("Name cannot be empty".to_string()));
        }
        if self.ring_size == 0 {
            return Err(crate::Error::Configuration("RingSize must be at least 1".to_string()));
        }
        if self.visibility < 0.0 {
            return Err(crate::Error::Configuration("Visibility cannot be negative".to_string()));
        }
        if self.sync_config_interval == 0 {
            return Err(crate::Error::Configuration(
                "SyncConfigInterval must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-queue configuration, persisted as a register map in the KV store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long a leased partition stays invisible after release, seconds
    pub visibility_timeout: f64,

    /// Lower bound on the partition pool size
    pub min_partitions: u32,

    /// Upper bound on the partition pool size
    pub max_partitions: u32,

    /// Idle age after which a partition is retired on reconcile, seconds
    pub max_partition_age: f64,

    /// Gzip message bodies at rest
    pub compressed_messages: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: 30.0,
            min_partitions: 1,
            max_partitions: 10,
            max_partition_age: 432_000.0,
            compressed_messages: false,
        }
    }
}

impl QueueConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `InvalidArgument` on the first inconsistent setting.
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_partitions == 0 {
            return Err(crate::Error::InvalidArgument(
                "min_partitions must be at least 1".to_string(),
            ));
        }
        if self.max_partitions < self.min_partitions {
            return Err(crate::Error::InvalidArgument(
                "max_partitions cannot be below min_partitions".to_string(),
            ));
        }
        if self.visibility_timeout < 0.0 {
            return Err(crate::Error::InvalidArgument(
                "visibility_timeout cannot be negative".to_string(),
            ));
        }
        if self.max_partition_age < 0.0 {
            return Err(crate::Error::InvalidArgument(
                "max_partition_age cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the config as the register map stored in the KV record.
    pub fn as_registers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("visibility_timeout".to_string(), self.visibility_timeout.to_string()),
            ("min_partitions".to_string(), self.min_partitions.to_string()),
            ("max_partitions".to_string(), self.max_partitions.to_string()),
            ("max_partition_age".to_string(), self.max_partition_age.to_string()),
            ("compressed_messages".to_string(), self.compressed_messages.to_string()),
        ])
    }

    /// Overlay a stored register map on top of this config.
    ///
    /// Missing registers keep the current value, so records written by
    /// older nodes stay readable.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if a register fails to parse or the
    /// merged result is inconsistent.
    pub fn merged_with_registers(
        &self,
        registers: &BTreeMap<String, String>,
    ) -> crate::Result<Self> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
            value.parse().map_err(|_| {
                crate::Error::InvalidArgument(format!("register {key} has invalid value {value:?}"))
            })
        }

        let mut merged = self.clone();
        if let Some(v) = registers.get("visibility_timeout") {
            merged.visibility_timeout = parse("visibility_timeout", v)?;
        }
        if let Some(v) = registers.get("min_partitions") {
            merged.min_partitions = parse("min_partitions", v)?;
        }
        if let Some(v) = registers.get("max_partitions") {
            merged.max_partitions = parse("max_partitions", v)?;
        }
        if let Some(v) = registers.get("max_partition_age") {
            merged.max_partition_age = parse("max_partition_age", v)?;
        }
        if let Some(v) = registers.get("compressed_messages") {
            merged.compressed_messages = parse("compressed_messages", v)?;
        }
        merged.validate()?;
        Ok(merged)
    }
}
