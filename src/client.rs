//! Client façade
//!
//! Hashes keys through the continuum, dispatches commands to the owning
//! server connection, and aggregates multi-key fan-out results. Applies the
//! configured namespace prefix on dispatch and strips it from retrieve
//! responses before they reach the caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::net::ServerConnection;
use crate::protocol::{Command, CommandResponse, CommandType, ResponseData, ResponseStatus};
use crate::ring::{Continuum, ServerDescriptor};

// =============================================================================
// Reply handle
// =============================================================================

/// Handle to a dispatched command's eventual response.
///
/// Every dispatched command resolves: with the server's response, or with a
/// synthetic error when the connection is down or drops mid-flight. There
/// is no client-enforced timeout; `wait` blocks until the response arrives.
pub struct Reply {
    rx: Receiver<CommandResponse>,
}

impl Reply {
    fn new() -> (Sender<CommandResponse>, Self) {
        let (tx, rx) = channel::bounded(1);
        (tx, Reply { rx })
    }

    /// Block until the response arrives
    pub fn wait(self) -> CommandResponse {
        self.rx
            .recv()
            .unwrap_or_else(|_| CommandResponse::error("Connection terminated before reply"))
    }

    /// Block for at most `timeout`; `None` if no response arrived in time
    pub fn wait_timeout(self, timeout: Duration) -> Option<CommandResponse> {
        self.rx.recv_timeout(timeout).ok()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for a cluster of memcache servers.
///
/// Holds the continuum and one [`ServerConnection`] per server; individual
/// keys route independently, so multi-key operations may fan out across
/// servers.
pub struct MemcacheClient {
    continuum: Continuum,
    connections: HashMap<String, Arc<ServerConnection>>,
    namespace: Option<String>,
}

impl MemcacheClient {
    /// Build the continuum and spawn one connection per server.
    ///
    /// Fails fast on configuration errors; connecting itself happens in the
    /// background with retry/backoff.
    pub fn new(config: Config) -> Result<Self> {
        let servers = config.validate()?;
        let continuum = Continuum::new(
            servers,
            config.continuum,
            config.hash_algorithm,
            config.points_per_server,
        )?;

        let retry_interval = Duration::from_millis(config.retry_interval_ms);
        let mut connections = HashMap::new();
        for server in continuum.servers() {
            if !connections.contains_key(server.label()) {
                let connection = ServerConnection::spawn(server.clone(), retry_interval)?;
                connections.insert(server.label().to_string(), Arc::new(connection));
            }
        }

        tracing::info!(
            servers = connections.len(),
            points = continuum.point_count(),
            "memcache client initialized"
        );

        Ok(MemcacheClient {
            continuum,
            connections,
            namespace: config.namespace,
        })
    }

    // -------------------------------------------------------------------------
    // Retrieval
    // -------------------------------------------------------------------------

    /// Get a single key
    pub fn get(&self, key: &str) -> Reply {
        let (tx, reply) = Reply::new();
        self.send_get(key, Box::new(move |response| {
            let _ = tx.send(response);
        }));
        reply
    }

    /// Get several keys, each independently hashed and dispatched.
    ///
    /// Sub-responses are aggregated behind a counting barrier: successful
    /// data maps merge into one, and any partial hit counts as overall
    /// success. The aggregate is an error only when every sub-response
    /// failed and none succeeded; its message joins the sub-errors.
    pub fn get_multi<I, S>(&self, keys: I) -> Reply
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let (tx, reply) = Reply::new();

        if keys.is_empty() {
            let _ = tx.send(CommandResponse::success(ResponseData::Values(HashMap::new())));
            return reply;
        }

        let barrier = Arc::new(MultiGetBarrier::new(keys.len(), tx));
        for key in keys {
            let barrier = Arc::clone(&barrier);
            self.send_get(&key, Box::new(move |response| {
                barrier.complete(response);
            }));
        }
        reply
    }

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------

    /// Store a value unconditionally
    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>, expires: u32) -> Reply {
        self.dispatch(CommandType::Set, key, Some(value.into()), Some(expires))
    }

    /// Store only if the key does not exist
    pub fn add(&self, key: &str, value: impl Into<Vec<u8>>, expires: u32) -> Reply {
        self.dispatch(CommandType::Add, key, Some(value.into()), Some(expires))
    }

    /// Store only if the key already exists
    pub fn replace(&self, key: &str, value: impl Into<Vec<u8>>, expires: u32) -> Reply {
        self.dispatch(CommandType::Replace, key, Some(value.into()), Some(expires))
    }

    /// Append bytes to an existing value
    pub fn append(&self, key: &str, value: impl Into<Vec<u8>>) -> Reply {
        self.dispatch(CommandType::Append, key, Some(value.into()), None)
    }

    /// Prepend bytes to an existing value
    pub fn prepend(&self, key: &str, value: impl Into<Vec<u8>>) -> Reply {
        self.dispatch(CommandType::Prepend, key, Some(value.into()), None)
    }

    // -------------------------------------------------------------------------
    // Counters / expiry / removal
    // -------------------------------------------------------------------------

    /// Increment a counter by `delta`
    pub fn incr(&self, key: &str, delta: u64) -> Reply {
        self.dispatch(
            CommandType::Incr,
            key,
            Some(delta.to_string().into_bytes()),
            None,
        )
    }

    /// Decrement a counter by `delta`
    pub fn decr(&self, key: &str, delta: u64) -> Reply {
        self.dispatch(
            CommandType::Decr,
            key,
            Some(delta.to_string().into_bytes()),
            None,
        )
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Reply {
        self.dispatch(CommandType::Delete, key, None, None)
    }

    /// Update a key's expiration without touching its value
    pub fn touch(&self, key: &str, expires: u32) -> Reply {
        self.dispatch(CommandType::Touch, key, None, Some(expires))
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Configured namespace prefix, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Servers participating in the ring
    pub fn servers(&self) -> &[ServerDescriptor] {
        self.continuum.servers()
    }

    /// Number of servers with an established socket right now.
    ///
    /// Connecting happens in the background after construction; callers
    /// that must distinguish startup from outage can poll this.
    pub fn connected_servers(&self) -> usize {
        self.connections.values().filter(|c| c.is_connected()).count()
    }

    /// Tear down every connection, resolving outstanding commands with a
    /// synthetic error. Also runs on drop.
    pub fn close(&self) {
        for connection in self.connections.values() {
            connection.close();
        }
    }

    // -------------------------------------------------------------------------
    // Dispatch internals
    // -------------------------------------------------------------------------

    /// Namespaced cache key sent on the wire
    fn cache_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}{key}"),
            None => key.to_string(),
        }
    }

    /// Connection owning `cache_key` per the continuum
    fn connection_for(&self, cache_key: &str) -> &Arc<ServerConnection> {
        let server = self.continuum.lookup(cache_key);
        self.connections
            .get(server.label())
            .expect("continuum servers and connections are built together")
    }

    fn dispatch(
        &self,
        kind: CommandType,
        key: &str,
        value: Option<Vec<u8>>,
        expires: Option<u32>,
    ) -> Reply {
        let cache_key = self.cache_key(key);
        let connection = self.connection_for(&cache_key);
        let (tx, reply) = Reply::new();
        connection.send(
            Command::new(kind, cache_key, value, expires),
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );
        reply
    }

    /// Dispatch one get, translating the namespaced key back to the
    /// caller's key in the response data map.
    fn send_get(&self, key: &str, on_complete: crate::net::CompletionFn) {
        let cache_key = self.cache_key(key);
        let connection = self.connection_for(&cache_key);
        let caller_key = key.to_string();
        let sent_key = cache_key.clone();
        connection.send(
            Command::new(CommandType::Get, cache_key, None, None),
            Box::new(move |response| {
                on_complete(translate_key(response, &sent_key, &caller_key));
            }),
        );
    }
}

impl Drop for MemcacheClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Rename the namespaced key back to the caller-supplied one in a retrieve
/// response's data map
fn translate_key(mut response: CommandResponse, sent_key: &str, caller_key: &str) -> CommandResponse {
    if sent_key != caller_key {
        if let ResponseData::Values(map) = &mut response.data {
            if let Some(value) = map.remove(sent_key) {
                map.insert(caller_key.to_string(), value);
            }
        }
    }
    response
}

// =============================================================================
// Multi-get aggregation
// =============================================================================

/// Counting barrier over the fan-out of a multi-key get.
///
/// Sub-responses complete concurrently from different connection reader
/// threads; counters are atomic and the merged map is mutex-protected. The
/// final reply fires exactly once, when the last sub-response lands.
struct MultiGetBarrier {
    remaining: AtomicUsize,
    successes: AtomicUsize,
    failures: AtomicUsize,
    errors: AtomicUsize,
    merged: Mutex<MergedState>,
    reply_tx: Sender<CommandResponse>,
}

#[derive(Default)]
struct MergedState {
    values: HashMap<String, String>,
    messages: Vec<String>,
}

impl MultiGetBarrier {
    fn new(total: usize, reply_tx: Sender<CommandResponse>) -> Self {
        MultiGetBarrier {
            remaining: AtomicUsize::new(total),
            successes: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            merged: Mutex::new(MergedState::default()),
            reply_tx,
        }
    }

    fn complete(&self, response: CommandResponse) {
        match response.status {
            ResponseStatus::Success => {
                if let ResponseData::Values(values) = response.data {
                    self.merged.lock().values.extend(values);
                }
                self.successes.fetch_add(1, Ordering::SeqCst);
            }
            ResponseStatus::Fail => {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
            ResponseStatus::Error => {
                if let Some(message) = response.message {
                    self.merged.lock().messages.push(message);
                }
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }

        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        let state = std::mem::take(&mut *self.merged.lock());
        let successes = self.successes.load(Ordering::SeqCst);
        let failures = self.failures.load(Ordering::SeqCst);
        let errors = self.errors.load(Ordering::SeqCst);

        // Partial hits count as overall success; only a fully failed
        // fan-out surfaces as an error
        let response = if failures + errors == 0 || successes > 0 {
            CommandResponse::success(ResponseData::Values(state.values))
        } else {
            CommandResponse::error(state.messages.join(", "))
        };

        let _ = self.reply_tx.send(response);
    }
}
