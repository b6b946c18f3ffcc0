//! Server descriptors
//!
//! Parses `"host[:port[:weight]]"` strings into their components.

use std::fmt;
use std::str::FromStr;

use crate::error::MemclusterError;

/// Port assumed when the descriptor omits one
pub const DEFAULT_PORT: u16 = 11211;

/// Weight assumed when the descriptor omits one
pub const DEFAULT_WEIGHT: u32 = 8;

/// One memcache server, segmented into its components.
///
/// The original `label` string is retained: it identifies the server in ring
/// entries and connection routing, and in log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    host: String,
    port: u16,
    weight: u32,
    label: String,
}

impl ServerDescriptor {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// The raw `"host[:port[:weight]]"` string this descriptor was parsed from
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl FromStr for ServerDescriptor {
    type Err = MemclusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MemclusterError::Config(format!("Invalid server '{s}'"));

        let mut parts = s.splitn(3, ':');
        let host = parts.next().filter(|h| !h.is_empty()).ok_or_else(malformed)?;
        if !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(malformed());
        }

        let port = match parts.next() {
            Some(p) => p.parse::<u16>().map_err(|_| malformed())?,
            None => DEFAULT_PORT,
        };
        let weight = match parts.next() {
            Some(w) => w.parse::<u32>().map_err(|_| malformed())?,
            None => DEFAULT_WEIGHT,
        };

        Ok(ServerDescriptor {
            host: host.to_string(),
            port,
            weight,
            label: s.to_string(),
        })
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}
