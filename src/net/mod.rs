//! Connection management
//!
//! One persistent, pipelined TCP connection per server with automatic
//! reconnect and capped exponential backoff.

mod backoff;
mod connection;

pub use backoff::{Backoff, MAX_DELAY};
pub use connection::{CompletionFn, ServerConnection};
