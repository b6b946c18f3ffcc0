//! Protocol Module
//!
//! The memcache ASCII wire protocol: command serialization, CRLF frame
//! reassembly, and incremental per-command response parsing.
//!
//! ## Wire Format
//!
//! ### Requests
//! ```text
//! set somekey 0 300 4\r\nblue\r\n      (storage: flags, expiry, length, raw bytes)
//! get somekey\r\n
//! incr counter 5\r\n
//! ```
//!
//! ### Responses
//! ```text
//! STORED\r\n                            (terminal token)
//! VALUE somekey 0 4\r\nblue\r\nEND\r\n  (retrieve: header, body, terminal)
//! 6\r\n                                 (incr/decr: new counter value)
//! SERVER ERROR out of memory\r\n        (server-reported error)
//! ```
//!
//! Responses arrive strictly in request order; a parser is bound to each
//! outstanding command and consumes lines until its response completes.

mod codec;
mod command;
mod frame;
mod parser;
mod response;

pub use codec::encode_command;
pub use command::{Command, CommandFamily, CommandType};
pub use frame::FrameReader;
pub use parser::LineParser;
pub use response::{CommandResponse, ResponseData, ResponseStatus, ResponseType};
