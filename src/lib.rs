//! # memcluster
//!
//! A client for a cluster of memcache-protocol servers with:
//! - Consistent-hashing key distribution (ketama and default continuums)
//! - One persistent, pipelined TCP connection per server
//! - Incremental response parsing over fragmented reads
//! - Automatic reconnect with capped exponential backoff
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MemcacheClient                           │
//! │        (namespacing, dispatch, multi-get fan-out)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Continuum                               │
//! │          (hash ring: which server owns this key)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ ServerConn  │   ...    │ ServerConn  │   one per server
//!   │ (pipelined  │          │ (pipelined  │
//!   │  FIFO +     │          │  FIFO +     │
//!   │  reconnect) │          │  reconnect) │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ FrameReader │          │ FrameReader │   CRLF reassembly
//!   │ LineParser  │          │ LineParser  │   per-command state machine
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! Responses on a connection arrive strictly in request order, so pending
//! commands are matched to response lines purely by FIFO position.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod hash;
pub mod ring;
pub mod protocol;
pub mod net;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MemclusterError, Result};
pub use config::{Config, ConfigBuilder};
pub use hash::HashAlgorithm;
pub use ring::{Continuum, ContinuumStrategy, ServerDescriptor};
pub use protocol::{CommandResponse, ResponseData, ResponseStatus, ResponseType};
pub use client::{MemcacheClient, Reply};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memcluster
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
