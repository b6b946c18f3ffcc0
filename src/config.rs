//! Configuration for memcluster
//!
//! Centralized configuration with sensible defaults.

use crate::error::{MemclusterError, Result};
use crate::hash::HashAlgorithm;
use crate::ring::{ContinuumStrategy, ServerDescriptor};

/// Default number of ring points assigned per server
pub const DEFAULT_POINTS_PER_SERVER: usize = 160;

/// Default base reconnect interval (milliseconds)
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 50;

/// Main configuration for a memcluster client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Cluster Configuration
    // -------------------------------------------------------------------------
    /// Servers as `"host[:port[:weight]]"` strings (port defaults to 11211,
    /// weight to 8)
    pub servers: Vec<String>,

    /// Key hash used for ring lookups
    pub hash_algorithm: HashAlgorithm,

    /// Ring-construction strategy
    pub continuum: ContinuumStrategy,

    /// Ring points assigned per server before weighting
    pub points_per_server: usize,

    // -------------------------------------------------------------------------
    // Key Configuration
    // -------------------------------------------------------------------------
    /// Optional prefix applied to every key before hashing and dispatch,
    /// isolating this consumer's keys on shared servers
    pub namespace: Option<String>,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Base reconnect interval in milliseconds; doubled per consecutive
    /// failed connect attempt, capped at 60 seconds
    pub retry_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            hash_algorithm: HashAlgorithm::Fnv1_32,
            continuum: ContinuumStrategy::Ketama,
            points_per_server: DEFAULT_POINTS_PER_SERVER,
            namespace: None,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate the configuration, parsing every server descriptor.
    ///
    /// Fails fast at construction time; malformed server strings are never
    /// retried.
    pub fn validate(&self) -> Result<Vec<ServerDescriptor>> {
        if self.servers.is_empty() {
            return Err(MemclusterError::Config("No servers defined".to_string()));
        }
        if self.points_per_server == 0 {
            return Err(MemclusterError::Config(
                "points_per_server must be at least 1".to_string(),
            ));
        }
        if self.retry_interval_ms == 0 {
            return Err(MemclusterError::Config(
                "retry_interval_ms must be at least 1".to_string(),
            ));
        }

        self.servers.iter().map(|s| s.parse()).collect()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Add a single server (`"host[:port[:weight]]"`)
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.servers.push(server.into());
        self
    }

    /// Set the full server list
    pub fn servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the key hash algorithm
    pub fn hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.config.hash_algorithm = algorithm;
        self
    }

    /// Set the ring-construction strategy
    pub fn continuum(mut self, strategy: ContinuumStrategy) -> Self {
        self.config.continuum = strategy;
        self
    }

    /// Set the number of ring points per server
    pub fn points_per_server(mut self, points: usize) -> Self {
        self.config.points_per_server = points;
        self
    }

    /// Set the key namespace prefix
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set the base reconnect interval (in milliseconds)
    pub fn retry_interval_ms(mut self, ms: u64) -> Self {
        self.config.retry_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
