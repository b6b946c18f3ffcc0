//! Continuum construction and lookup
//!
//! Builds the sorted hash ring from a server list and answers "which server
//! owns this key". Two point-placement strategies are supported: the
//! SHA-1-based default and the MD5-based ketama distribution.

use std::collections::BTreeMap;

use md5::Md5;
use sha1::{Digest, Sha1};

use crate::error::{MemclusterError, Result};
use crate::hash::HashAlgorithm;
use crate::ring::server::{ServerDescriptor, DEFAULT_PORT};

/// Ketama derives 4 ring points from each MD5 digest
const KETAMA_SAMPLES: usize = 4;

/// Ring-construction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuumStrategy {
    /// SHA-1 of `"{host}:{port}:{index}"`, one ring point per digest
    Default,

    /// MD5 of `"{host}[-:{port}]-{group}"`, four ring points per digest
    /// (libmemcached-compatible ketama placement)
    #[default]
    Ketama,
}

/// Immutable hash ring mapping key hashes to servers.
///
/// Entries are keyed solely by hash value; a later server whose point
/// collides with an earlier one overwrites it, matching the reference
/// distribution. Built once, never rehashed.
#[derive(Debug)]
pub struct Continuum {
    servers: Vec<ServerDescriptor>,
    entries: BTreeMap<u64, usize>,
    hash_algorithm: HashAlgorithm,
}

impl Continuum {
    /// Build a continuum from parsed server descriptors.
    ///
    /// A single-server ring gets one sentinel entry at the maximum hash so
    /// every lookup resolves to it. Otherwise each server receives
    /// `floor(total_servers * points_per_server * weight / total_weight)`
    /// points, placed by the chosen strategy.
    pub fn new(
        servers: Vec<ServerDescriptor>,
        strategy: ContinuumStrategy,
        hash_algorithm: HashAlgorithm,
        points_per_server: usize,
    ) -> Result<Self> {
        if servers.is_empty() {
            return Err(MemclusterError::Config("No servers defined".to_string()));
        }

        let total_weight: u64 = servers.iter().map(|s| u64::from(s.weight())).sum();
        if total_weight == 0 {
            return Err(MemclusterError::Config(
                "Total server weight is zero".to_string(),
            ));
        }

        let mut entries = BTreeMap::new();

        if servers.len() == 1 {
            entries.insert(u64::MAX, 0);
        } else {
            let total = servers.len() as u64 * points_per_server as u64;
            for (idx, server) in servers.iter().enumerate() {
                let count = (total * u64::from(server.weight()) / total_weight) as usize;
                match strategy {
                    ContinuumStrategy::Default => {
                        add_default_entries(&mut entries, server, idx, count);
                    }
                    ContinuumStrategy::Ketama => {
                        add_ketama_entries(&mut entries, server, idx, count);
                    }
                }
            }
        }

        tracing::debug!(
            servers = servers.len(),
            points = entries.len(),
            ?strategy,
            "continuum built"
        );

        Ok(Continuum {
            servers,
            entries,
            hash_algorithm,
        })
    }

    /// Find the server owning `key`.
    ///
    /// Hashes the key and takes the smallest ring point at or above the
    /// hash, wrapping to the first point when the hash lies past the last
    /// one. O(log n).
    pub fn lookup(&self, key: &str) -> &ServerDescriptor {
        let idx = if self.entries.len() == 1 {
            *self.entries.values().next().expect("ring is never empty")
        } else {
            let hash = self.hash_algorithm.hash(key);
            self.entries
                .range(hash..)
                .next()
                .or_else(|| self.entries.iter().next())
                .map(|(_, &idx)| idx)
                .expect("ring is never empty")
        };
        &self.servers[idx]
    }

    /// Servers participating in the ring, in configuration order
    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    /// Total number of ring points
    pub fn point_count(&self) -> usize {
        self.entries.len()
    }
}

/// Place `count` points for one server using the default (SHA-1) strategy.
fn add_default_entries(
    entries: &mut BTreeMap<u64, usize>,
    server: &ServerDescriptor,
    server_idx: usize,
    count: usize,
) {
    for i in 0..count {
        let point_key = format!("{}:{}:{}", server.host(), server.port(), i);
        let digest = Sha1::digest(point_key.as_bytes());
        // First 4 digest bytes, read as a big-endian hex value
        let value = u64::from(u32::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3],
        ]));
        entries.insert(value, server_idx);
    }
}

/// Place `count` points for one server using the ketama strategy.
///
/// Points are generated in groups of 4 per MD5 digest; the group loop runs
/// `ceil(count / 4)` times, matching the reference distribution (and its
/// rounding) exactly.
fn add_ketama_entries(
    entries: &mut BTreeMap<u64, usize>,
    server: &ServerDescriptor,
    server_idx: usize,
    count: usize,
) {
    let groups = count.div_ceil(KETAMA_SAMPLES);
    for group in 0..groups {
        let point_key = if server.port() == DEFAULT_PORT {
            format!("{}-{}", server.host(), group)
        } else {
            format!("{}:{}-{}", server.host(), server.port(), group)
        };
        let digest = Md5::digest(point_key.as_bytes());

        for sample in 0..KETAMA_SAMPLES {
            let off = sample * 4;
            let value = u64::from(u32::from_le_bytes([
                digest[off],
                digest[off + 1],
                digest[off + 2],
                digest[off + 3],
            ]));
            entries.insert(value, server_idx);
        }
    }
}
