//! Command encoder
//!
//! Serializes commands into the memcache ASCII wire format.
//!
//! ## Wire Format
//!
//! ```text
//! {name} {key}[ 0][ {expires}][ {len}\r\n{value} | {value}]\r\n
//! ```
//!
//! Storage-family commands (set/add/replace/append/prepend) carry a literal
//! `0` flags field and send their value as a length-prefixed raw byte block,
//! so the payload is binary-safe. Non-storage values (the incr/decr delta)
//! are written as plain text on the command line.
//!
//! Examples:
//!
//! ```text
//! set somekey 0 300 4\r\nblue\r\n
//! get somekey\r\n
//! incr counter 5\r\n
//! ```

use super::command::{Command, CommandFamily};

/// Encode a command as a single contiguous buffer.
///
/// The caller writes the returned buffer in one call so pipelined commands
/// never interleave on the socket.
pub fn encode_command(command: &Command) -> Vec<u8> {
    let value_len = command.value.as_ref().map(|v| v.len()).unwrap_or(0);
    let mut buf = Vec::with_capacity(command.kind.name().len() + command.key.len() + value_len + 32);

    let storage = command.kind.family() == CommandFamily::Store;

    buf.extend_from_slice(command.kind.name().as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(command.key.as_bytes());

    // Flags are not user-configurable; storage commands always send 0
    if storage {
        buf.extend_from_slice(b" 0");
    }

    if let Some(expires) = command.expires {
        buf.push(b' ');
        buf.extend_from_slice(expires.to_string().as_bytes());
    }

    if let Some(value) = &command.value {
        buf.push(b' ');
        if storage {
            buf.extend_from_slice(value.len().to_string().as_bytes());
            buf.extend_from_slice(b"\r\n");
            buf.extend_from_slice(value);
        } else {
            buf.extend_from_slice(value);
        }
    }

    buf.extend_from_slice(b"\r\n");
    buf
}
