//! Server connection
//!
//! Owns one TCP socket to one memcache server, the pending-command FIFO,
//! and the reconnect/backoff state machine. Commands are pipelined: each is
//! encoded and written as a unit, then queued; responses arrive strictly in
//! order and are matched to the queue head.
//!
//! A dedicated worker thread per connection drives
//! `Disconnected → Connecting → Connected → Disconnected` transitions and
//! owns the socket read side. Callers on any thread write through the
//! session lock, which serializes socket writes with queue insertion so the
//! FIFO order always matches the wire order.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::{encode_command, Command, CommandResponse, FrameReader, LineParser};
use crate::ring::ServerDescriptor;

use super::backoff::Backoff;

/// Message delivered when a connection drops with commands outstanding
const CLOSED_MESSAGE: &str = "Socket closed unexpectedly";

/// Completion callback invoked exactly once per dispatched command
pub type CompletionFn = Box<dyn FnOnce(CommandResponse) + Send + 'static>;

/// A dispatched command awaiting its response.
///
/// Owned exclusively by the per-session FIFO; resolved either by its parser
/// completing or by the teardown drain.
struct PendingCommand {
    name: &'static str,
    key: String,
    parser: LineParser,
    on_complete: CompletionFn,
}

impl PendingCommand {
    fn complete(self, response: CommandResponse) {
        (self.on_complete)(response);
    }
}

/// Live socket state, present only while connected
struct Session {
    stream: TcpStream,
    queue_tx: Sender<PendingCommand>,
}

struct Shared {
    server: ServerDescriptor,
    session: Mutex<Option<Session>>,
    connected: AtomicBool,
    shutdown: AtomicBool,
}

/// One pipelined connection to one server, with automatic reconnect
pub struct ServerConnection {
    shared: Arc<Shared>,
    shutdown_tx: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ServerConnection {
    /// Spawn the connection worker for `server`.
    ///
    /// Connecting happens on the worker thread; this returns immediately
    /// and commands sent before the first connect resolve with a synthetic
    /// unavailable error.
    pub fn spawn(server: ServerDescriptor, retry_interval: Duration) -> Result<Self> {
        let shared = Arc::new(Shared {
            server,
            session: Mutex::new(None),
            connected: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);

        let worker = thread::Builder::new()
            .name(format!("memcluster-{}", shared.server.label()))
            .spawn({
                let shared = Arc::clone(&shared);
                move || run_worker(&shared, &shutdown_rx, retry_interval)
            })?;

        Ok(ServerConnection {
            shared,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// The server this connection talks to
    pub fn server(&self) -> &ServerDescriptor {
        &self.shared.server
    }

    /// Whether the socket is currently established
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Encode, enqueue, and write a command.
    ///
    /// `on_complete` is always invoked exactly once: with the parsed
    /// response, or with a synthetic error if the connection is down or
    /// drops before the response arrives.
    pub fn send(&self, command: Command, on_complete: CompletionFn) {
        let encoded = encode_command(&command);
        let name = command.kind.name();

        let mut guard = self.shared.session.lock();
        match guard.as_mut() {
            Some(session) => {
                let pending = PendingCommand {
                    name,
                    key: command.key,
                    parser: LineParser::for_family(command.kind.family()),
                    on_complete,
                };
                tracing::debug!(command = name, key = %pending.key, server = %self.shared.server, "command dispatched");

                // Enqueue before writing: once the bytes hit the wire the
                // response can arrive immediately, and the reader matches
                // it to the queue head
                if let Err(rejected) = session.queue_tx.send(pending) {
                    // Reader side already gone; the session is stale
                    rejected
                        .into_inner()
                        .complete(CommandResponse::error(CLOSED_MESSAGE));
                    return;
                }

                if let Err(e) = session.stream.write_all(&encoded) {
                    tracing::warn!(server = %self.shared.server, error = %e, "write failed");
                    // The command is already queued; shutting the socket
                    // down hands it to the teardown drain, which resolves
                    // it exactly once
                    let _ = session.stream.shutdown(Shutdown::Both);
                }
            }
            None => {
                drop(guard);
                tracing::debug!(command = name, server = %self.shared.server, "server unavailable");
                on_complete(CommandResponse::error(format!(
                    "Memcache server unavailable: {}",
                    self.shared.server.label()
                )));
            }
        }
    }

    /// Tear the connection down: drains outstanding commands with a
    /// synthetic error, closes the socket, and stops the worker.
    pub fn close(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.try_send(());
        if let Some(session) = self.shared.session.lock().as_ref() {
            let _ = session.stream.shutdown(Shutdown::Both);
        }
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Worker: reconnect loop
// =============================================================================

fn run_worker(shared: &Shared, shutdown_rx: &Receiver<()>, retry_interval: Duration) {
    let mut backoff = Backoff::new(retry_interval);

    while !shared.shutdown.load(Ordering::SeqCst) {
        tracing::trace!(server = %shared.server, "connecting");
        match TcpStream::connect((shared.server.host(), shared.server.port())) {
            Ok(stream) => {
                backoff.reset();
                let _ = stream.set_nodelay(true);

                let reader = match stream.try_clone() {
                    Ok(reader) => reader,
                    Err(e) => {
                        tracing::warn!(server = %shared.server, error = %e, "socket clone failed");
                        let delay = backoff.connect_failed();
                        if wait_shutdown(shutdown_rx, delay) {
                            break;
                        }
                        continue;
                    }
                };

                let (queue_tx, queue_rx) = channel::unbounded();
                *shared.session.lock() = Some(Session { stream, queue_tx });
                shared.connected.store(true, Ordering::SeqCst);
                tracing::debug!(server = %shared.server, "connection established");

                let result = read_loop(shared, reader, &queue_rx);

                // Withdraw the session before draining so no new command can
                // slip into the dead queue
                shared.connected.store(false, Ordering::SeqCst);
                *shared.session.lock() = None;
                drain_pending(shared, &queue_rx);

                if let Err(e) = result {
                    tracing::warn!(server = %shared.server, error = %e, "connection torn down");
                } else {
                    tracing::warn!(server = %shared.server, "socket closed");
                }

                // Closed-connection path: reconnect at the current delay,
                // unchanged; only failed connect attempts escalate it
                if wait_shutdown(shutdown_rx, backoff.current()) {
                    break;
                }
            }
            Err(e) => {
                let delay = backoff.connect_failed();
                tracing::warn!(
                    server = %shared.server,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "connect failed; backing off"
                );
                if wait_shutdown(shutdown_rx, delay) {
                    break;
                }
            }
        }
    }

    // Resolve anything that arrived between teardown and shutdown
    if let Some(session) = shared.session.lock().take() {
        let _ = session.stream.shutdown(Shutdown::Both);
    }
    shared.connected.store(false, Ordering::SeqCst);
}

/// Sleep for `delay`, returning early (true) when shutdown is signaled
fn wait_shutdown(shutdown_rx: &Receiver<()>, delay: Duration) -> bool {
    !matches!(shutdown_rx.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
}

// =============================================================================
// Worker: established-connection read loop
// =============================================================================

/// Read socket chunks, reassemble lines, and feed them to the parser of the
/// command at the head of the FIFO until the socket closes or a fatal
/// protocol error desynchronizes the stream.
fn read_loop(
    shared: &Shared,
    mut stream: TcpStream,
    queue_rx: &Receiver<PendingCommand>,
) -> Result<()> {
    let mut frame = FrameReader::new();
    let mut buf = [0u8; 8192];
    let mut current: Option<PendingCommand> = None;

    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                fail_current(&mut current);
                return Ok(());
            }
            Ok(n) => n,
            Err(e) => {
                fail_current(&mut current);
                return Err(e.into());
            }
        };

        let result = frame.feed(&buf[..n], |line| {
            if current.is_none() {
                current = queue_rx.try_recv().ok();
            }
            match current.as_mut() {
                Some(pending) => {
                    if pending.parser.feed(line)? {
                        if let Some(mut done) = current.take() {
                            let response = done.parser.take_response();
                            tracing::trace!(command = done.name, key = %done.key, "response complete");
                            done.complete(response);
                        }
                    }
                }
                None => {
                    // A line with nothing pending means the server is
                    // desynchronized; drop it and flag the connection
                    tracing::warn!(
                        server = %shared.server,
                        line = %String::from_utf8_lossy(line),
                        "discarding response line with no pending command"
                    );
                }
            }
            Ok(())
        });

        if let Err(e) = result {
            fail_current(&mut current);
            let _ = stream.shutdown(Shutdown::Both);
            return Err(e);
        }
    }
}

/// Resolve the in-flight command, if any, with the teardown error
fn fail_current(current: &mut Option<PendingCommand>) {
    if let Some(pending) = current.take() {
        pending.complete(CommandResponse::error(CLOSED_MESSAGE));
    }
}

/// Resolve every queued command with the teardown error
fn drain_pending(shared: &Shared, queue_rx: &Receiver<PendingCommand>) {
    let mut drained = 0;
    while let Ok(pending) = queue_rx.try_recv() {
        pending.complete(CommandResponse::error(CLOSED_MESSAGE));
        drained += 1;
    }
    if drained > 0 {
        tracing::warn!(server = %shared.server, drained, "drained pending commands");
    }
}
