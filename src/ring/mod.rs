//! Consistent-hashing ring
//!
//! Maps keys to servers. The ring is built once at client construction and
//! immutable afterwards; lookups are ordered-map ceiling searches.

mod continuum;
mod server;

pub use continuum::{Continuum, ContinuumStrategy};
pub use server::{ServerDescriptor, DEFAULT_PORT, DEFAULT_WEIGHT};
