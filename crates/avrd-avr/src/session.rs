use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use avrd_core::events::names;
use avrd_core::{AvrError, DeviceEvent};

use crate::bus::EventBus;

/// Seam between the correlator and whatever carries commands. The real
/// implementation is [`Session`]; tests use [`crate::mock::MockReceiver`].
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Fire-and-forget command send. An `Err` here is the transport-level
    /// rejection that races the response event.
    async fn send(&self, command: &str) -> Result<(), AvrError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// The persistent command/event session to the receiver.
///
/// Owns at most one live transport: a `connect()` on an already-connected
/// instance tears down the previous reader task and socket before dialing,
/// so a stale connection can never dispatch events. Incoming lines are
/// parsed into named device events and published on the session's bus, as
/// are the lifecycle events `connect`, `close`, and `error`.
pub struct Session {
    bus: EventBus,
    state: Arc<Mutex<ConnectionState>>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    // Incremented per connect; a reader that outlives its generation must
    // not publish lifecycle events for the replacement connection.
    generation: Arc<AtomicU64>,
}

impl Session {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            writer: tokio::sync::Mutex::new(None),
            reader_task: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Dial `addr` and start dispatching its events. Tears down any prior
    /// connection first; no two live connections coexist under one session.
    pub async fn connect(&self, addr: &str) -> Result<(), AvrError> {
        self.teardown().await;
        *self.state.lock() = ConnectionState::Connecting;

        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                self.bus.publish(names::ERROR, Value::String(e.to_string()));
                return Err(AvrError::Transport(e.to_string()));
            }
        };

        tracing::info!(addr, "session connected");
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(write_half);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let task = tokio::spawn(read_events(
            read_half,
            self.bus.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.generation),
            generation,
        ));
        *self.reader_task.lock() = Some(task);

        *self.state.lock() = ConnectionState::Connected;
        self.bus.publish(names::CONNECT, Value::Null);
        Ok(())
    }

    /// Permanently close the session.
    pub async fn close(&self) {
        self.teardown().await;
        *self.state.lock() = ConnectionState::Closed;
    }

    async fn teardown(&self) {
        // Bump the generation first so an aborting reader cannot publish.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.reader_task.lock().take() {
            task.abort();
        }
        self.writer.lock().await.take();
    }
}

#[async_trait]
impl CommandTransport for Session {
    async fn send(&self, command: &str) -> Result<(), AvrError> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(AvrError::NotConnected);
        };

        let mut line = command.as_bytes().to_vec();
        line.push(b'\n');
        match writer.write_all(&line).await {
            Ok(()) => Ok(()),
            Err(e) => Err(AvrError::Transport(e.to_string())),
        }
    }
}

async fn read_events(
    read_half: OwnedReadHalf,
    bus: EventBus,
    state: Arc<Mutex<ConnectionState>>,
    current_generation: Arc<AtomicU64>,
    my_generation: u64,
) {
    let mut lines = BufReader::new(read_half).lines();

    let closed_cleanly = loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let event = parse_event_line(&line);
                if event.name.is_empty() {
                    continue;
                }
                tracing::debug!(event = %event.name, "device event");
                bus.publish(&event.name, event.payload);
            }
            Ok(None) => break true,
            Err(e) => {
                tracing::warn!(error = %e, "session read error");
                break false;
            }
        }
    };

    // A torn-down reader belongs to a replaced connection; stay silent.
    if current_generation.load(Ordering::SeqCst) != my_generation {
        return;
    }

    *state.lock() = ConnectionState::Disconnected;
    if closed_cleanly {
        bus.publish(names::CLOSE, Value::Null);
    } else {
        bus.publish(names::ERROR, Value::String("connection error".into()));
    }
}

/// Wire format of an incoming event line: `<name> <payload>`, where the
/// payload is JSON when it parses as such and a bare string otherwise.
fn parse_event_line(line: &str) -> DeviceEvent {
    let line = line.trim_end_matches('\r');
    match line.split_once(' ') {
        Some((name, rest)) => {
            let payload = serde_json::from_str(rest)
                .unwrap_or_else(|_| Value::String(rest.to_owned()));
            DeviceEvent::new(name, payload)
        }
        None => DeviceEvent::new(line, Value::Null),
    }
}
