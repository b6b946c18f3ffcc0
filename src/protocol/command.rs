//! Command definitions
//!
//! Represents commands sent to memcache servers.

/// Command types (wire names are the lowercase variant names)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Get,
    Delete,
    Touch,
    Incr,
    Decr,
}

/// Response-parsing family a command belongs to.
///
/// The family selects both the line parser for the response and whether the
/// encoder emits the storage-command flags/length fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFamily {
    Store,
    Retrieve,
    Delete,
    Touch,
    Modify,
}

impl CommandType {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            CommandType::Set => "set",
            CommandType::Add => "add",
            CommandType::Replace => "replace",
            CommandType::Append => "append",
            CommandType::Prepend => "prepend",
            CommandType::Get => "get",
            CommandType::Delete => "delete",
            CommandType::Touch => "touch",
            CommandType::Incr => "incr",
            CommandType::Decr => "decr",
        }
    }

    /// Parsing family for this command
    pub fn family(&self) -> CommandFamily {
        match self {
            CommandType::Set
            | CommandType::Add
            | CommandType::Replace
            | CommandType::Append
            | CommandType::Prepend => CommandFamily::Store,
            CommandType::Get => CommandFamily::Retrieve,
            CommandType::Delete => CommandFamily::Delete,
            CommandType::Touch => CommandFamily::Touch,
            CommandType::Incr | CommandType::Decr => CommandFamily::Modify,
        }
    }
}

/// One command ready for encoding and dispatch
#[derive(Debug, Clone)]
pub struct Command {
    /// Command type
    pub kind: CommandType,

    /// Cache key (already namespaced by the client façade)
    pub key: String,

    /// Value bytes: the stored payload for storage-family commands, the
    /// decimal delta for incr/decr
    pub value: Option<Vec<u8>>,

    /// Expiration in seconds, where the command takes one
    pub expires: Option<u32>,
}

impl Command {
    pub fn new(
        kind: CommandType,
        key: impl Into<String>,
        value: Option<Vec<u8>>,
        expires: Option<u32>,
    ) -> Self {
        Command {
            kind,
            key: key.into(),
            value,
            expires,
        }
    }
}
