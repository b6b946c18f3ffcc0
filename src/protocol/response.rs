//! Response definitions
//!
//! Represents parsed memcache responses.

use std::collections::HashMap;

/// JSend-style response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

/// Known memcache response tokens.
///
/// `exact` tokens match a whole line; the others are prefixes (the line
/// carries further fields after the token).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Value,
    Stored,
    Deleted,
    Touched,
    NotStored,
    Exists,
    NotFound,
    End,
    Error,
    ClientError,
    ServerError,
}

impl ResponseType {
    /// Wire spelling of the token
    pub fn token(&self) -> &'static str {
        match self {
            ResponseType::Value => "VALUE ",
            ResponseType::Stored => "STORED",
            ResponseType::Deleted => "DELETED",
            ResponseType::Touched => "TOUCHED",
            ResponseType::NotStored => "NOT_STORED",
            ResponseType::Exists => "EXISTS",
            ResponseType::NotFound => "NOT_FOUND",
            ResponseType::End => "END",
            ResponseType::Error => "ERROR",
            ResponseType::ClientError => "CLIENT ERROR",
            ResponseType::ServerError => "SERVER ERROR",
        }
    }

    /// Whether the token must match the whole line
    pub fn exact(&self) -> bool {
        !matches!(
            self,
            ResponseType::Value | ResponseType::ClientError | ResponseType::ServerError
        )
    }

    /// Test a reassembled line against this token
    pub fn matches(&self, line: &[u8]) -> bool {
        let token = self.token().as_bytes();
        if self.exact() {
            line == token
        } else {
            line.starts_with(token)
        }
    }
}

/// Per-family response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseData {
    /// No payload (base/error responses)
    None,

    /// Terminal token for store/delete/touch commands
    Token(ResponseType),

    /// New counter value for incr/decr; `None` when the key was not found
    Counter(Option<u64>),

    /// Retrieved key/value pairs
    Values(HashMap<String, String>),
}

/// A fully parsed response, immutable once delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Overall status
    pub status: ResponseStatus,

    /// Server-reported or synthetic error message
    pub message: Option<String>,

    /// Payload, by command family
    pub data: ResponseData,
}

impl CommandResponse {
    /// Create a success response with the given payload
    pub fn success(data: ResponseData) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: None,
            data,
        }
    }

    /// Create an error response carrying a message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
            data: ResponseData::None,
        }
    }

    /// Retrieved values, when this is a successful retrieve response
    pub fn values(&self) -> Option<&HashMap<String, String>> {
        match &self.data {
            ResponseData::Values(map) => Some(map),
            _ => None,
        }
    }
}
