//! Incremental response parsers
//!
//! One parser instance is paired with each outstanding command and fed
//! completed lines until it reports the response finished. All families
//! share the base behavior: a line that is exactly `ERROR`, or begins with
//! `CLIENT ERROR` / `SERVER ERROR`, terminates the response immediately
//! with an error status carrying the server's message.
//!
//! A line that matches no expected pattern is a fatal
//! [`MemclusterError::Protocol`]: the response stream can no longer be
//! aligned with the pending queue and the connection must be torn down.

use std::collections::HashMap;

use crate::error::{MemclusterError, Result};
use crate::protocol::command::CommandFamily;
use crate::protocol::response::{CommandResponse, ResponseData, ResponseStatus, ResponseType};

/// Tokens that terminate any response as a server-reported error
const BASE_ERROR_TYPES: [ResponseType; 3] = [
    ResponseType::Error,
    ResponseType::ClientError,
    ResponseType::ServerError,
];

/// Terminal tokens accepted per token-response family
const STORE_TYPES: [ResponseType; 4] = [
    ResponseType::Stored,
    ResponseType::NotStored,
    ResponseType::Exists,
    ResponseType::NotFound,
];
const DELETE_TYPES: [ResponseType; 2] = [ResponseType::Deleted, ResponseType::NotFound];
const TOUCH_TYPES: [ResponseType; 2] = [ResponseType::Touched, ResponseType::NotFound];

/// Shared base check for server-reported error lines
fn base_error(line: &[u8]) -> Option<CommandResponse> {
    let matched = BASE_ERROR_TYPES.iter().any(|t| t.matches(line));
    if matched {
        tracing::trace!(line = %String::from_utf8_lossy(line), "server-reported error");
        Some(CommandResponse::error(
            String::from_utf8_lossy(line).into_owned(),
        ))
    } else {
        None
    }
}

fn unexpected_format(line: &[u8]) -> MemclusterError {
    tracing::error!(line = %String::from_utf8_lossy(line), "unexpected response line");
    MemclusterError::Protocol("Unexpected format in response".to_string())
}

// =============================================================================
// Parser
// =============================================================================

/// Per-command response parser, selected by command family
#[derive(Debug)]
pub enum LineParser {
    /// Store/Delete/Touch: exactly one terminal line from a fixed token set
    Token(TokenLineParser),

    /// Incr/Decr: `NOT_FOUND` or the new decimal counter value
    Modify(ModifyLineParser),

    /// Get: VALUE header/body blocks terminated by `END`
    Retrieve(RetrieveLineParser),
}

impl LineParser {
    /// Select the parser for a command family
    pub fn for_family(family: CommandFamily) -> Self {
        match family {
            CommandFamily::Store => LineParser::Token(TokenLineParser::new(&STORE_TYPES)),
            CommandFamily::Delete => LineParser::Token(TokenLineParser::new(&DELETE_TYPES)),
            CommandFamily::Touch => LineParser::Token(TokenLineParser::new(&TOUCH_TYPES)),
            CommandFamily::Modify => LineParser::Modify(ModifyLineParser::default()),
            CommandFamily::Retrieve => LineParser::Retrieve(RetrieveLineParser::default()),
        }
    }

    /// Consume one reassembled line (CRLF already stripped).
    ///
    /// Returns `Ok(true)` when the response is complete, `Ok(false)` when
    /// more lines are needed, and `Err` on a fatal protocol mismatch.
    pub fn feed(&mut self, line: &[u8]) -> Result<bool> {
        match self {
            LineParser::Token(p) => p.feed(line),
            LineParser::Modify(p) => p.feed(line),
            LineParser::Retrieve(p) => p.feed(line),
        }
    }

    /// Extract the parsed response after `feed` reported completion.
    pub fn take_response(&mut self) -> CommandResponse {
        let response = match self {
            LineParser::Token(p) => p.response.take(),
            LineParser::Modify(p) => p.response.take(),
            LineParser::Retrieve(p) => p.response.take(),
        };
        // A parser drained before any terminal line yields a synthetic error
        response.unwrap_or_else(|| CommandResponse::error("Response returned unexpectedly."))
    }
}

// =============================================================================
// Token families (Store / Delete / Touch)
// =============================================================================

#[derive(Debug)]
pub struct TokenLineParser {
    expected: &'static [ResponseType],
    response: Option<CommandResponse>,
}

impl TokenLineParser {
    fn new(expected: &'static [ResponseType]) -> Self {
        TokenLineParser {
            expected,
            response: None,
        }
    }

    fn feed(&mut self, line: &[u8]) -> Result<bool> {
        if let Some(response) = base_error(line) {
            self.response = Some(response);
            return Ok(true);
        }

        match self.expected.iter().find(|t| t.matches(line)) {
            Some(&token) => {
                self.response = Some(CommandResponse::success(ResponseData::Token(token)));
                Ok(true)
            }
            None => Err(unexpected_format(line)),
        }
    }
}

// =============================================================================
// Modify family (incr / decr)
// =============================================================================

#[derive(Debug, Default)]
pub struct ModifyLineParser {
    response: Option<CommandResponse>,
}

impl ModifyLineParser {
    fn feed(&mut self, line: &[u8]) -> Result<bool> {
        if let Some(response) = base_error(line) {
            self.response = Some(response);
            return Ok(true);
        }

        if ResponseType::NotFound.matches(line) {
            self.response = Some(CommandResponse::success(ResponseData::Counter(None)));
            return Ok(true);
        }

        let value = std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| unexpected_format(line))?;

        self.response = Some(CommandResponse::success(ResponseData::Counter(Some(value))));
        Ok(true)
    }
}

// =============================================================================
// Retrieve family (get)
// =============================================================================

/// Retrieve responses are a two-state machine: *awaiting-header* expects a
/// `VALUE {key} {flags} {bytes}` line (or the terminal `END`);
/// *awaiting-body* copies raw lines into the declared-length buffer until it
/// is exactly filled, then returns to awaiting-header. `END` completes the
/// response with however many values were accumulated.
#[derive(Debug, Default)]
pub struct RetrieveLineParser {
    values: HashMap<String, String>,
    expected_key: Option<String>,
    expected_len: usize,
    body: Vec<u8>,
    response: Option<CommandResponse>,
}

impl RetrieveLineParser {
    fn feed(&mut self, line: &[u8]) -> Result<bool> {
        if let Some(response) = base_error(line) {
            self.response = Some(response);
            return Ok(true);
        }

        if ResponseType::Value.matches(line) {
            self.push_value_line(line)?;
            return Ok(false);
        }

        // END completes even while a body is outstanding; the token match
        // takes precedence over body collection
        if ResponseType::End.matches(line) {
            self.response = Some(CommandResponse::success(ResponseData::Values(
                std::mem::take(&mut self.values),
            )));
            return Ok(true);
        }

        if self.collecting() {
            self.push_value_line(line)?;
            return Ok(false);
        }

        Err(unexpected_format(line))
    }

    fn collecting(&self) -> bool {
        self.expected_key.is_some()
    }

    fn push_value_line(&mut self, line: &[u8]) -> Result<()> {
        if !self.collecting() {
            // Header: VALUE {key} {flags} {bytes}[ {cas}]
            let header = String::from_utf8_lossy(line);
            let parts: Vec<&str> = header.split(' ').collect();
            if parts.len() < 4 {
                return Err(unexpected_format(line));
            }
            let length = parts[3]
                .parse::<usize>()
                .map_err(|_| unexpected_format(line))?;

            self.expected_key = Some(parts[1].to_string());
            self.expected_len = length;
            self.body = Vec::with_capacity(length);
        } else if self.body.len() + line.len() <= self.expected_len {
            self.body.extend_from_slice(line);
        } else {
            tracing::error!(
                expected = self.expected_len,
                received = self.body.len() + line.len(),
                "value exceeds declared length"
            );
            return Err(MemclusterError::Protocol(
                "Length of value exceeds expected response".to_string(),
            ));
        }

        // Declared length reached; record the value and await the next header
        if self.body.len() == self.expected_len {
            if let Some(key) = self.expected_key.take() {
                let value = String::from_utf8_lossy(&self.body).into_owned();
                self.values.insert(key, value);
            }
            self.expected_len = 0;
            self.body = Vec::new();
        }

        Ok(())
    }
}
