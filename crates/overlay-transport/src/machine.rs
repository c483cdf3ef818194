//! Connection state machine.
//!
//! The machine performs no I/O. Each input returns the actions the driver
//! must carry out: open or close a socket, start or stop the countdown
//! timer. Socket callbacks are tagged with the [`SocketId`] they belong to,
//! so closes of sockets the machine itself superseded are recognised and
//! consumed without touching the current status.

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};

use overlay_ipc::{ConnectionSnapshot, ConnectionStatus, RetryState};
use overlay_sdk::EventEmitter;

use crate::bundle::{decode_frame, parse_bundle, ClientMessageBundle};
use crate::connection::{CloseKind, RetryPolicy};
use crate::error::ConnectionError;
use crate::TransportResult;

/// Identifies one socket opened by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

/// Side effect requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new socket to the endpoint.
    Open { socket: SocketId },

    /// Close a socket. Its close callback will be ignored.
    Close { socket: SocketId },

    /// Start ticking once per second.
    StartTimer,

    /// Stop the countdown timer.
    StopTimer,
}

/// Counters kept by the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStatistics {
    pub frames_received: u64,
    pub events_dispatched: u64,
    pub parse_failures: u64,
    pub handler_failures: u64,
    pub connection_attempts: u64,
}

/// Connection lifecycle state machine.
pub struct ConnectionMachine {
    policy: RetryPolicy,
    status: ConnectionStatus,
    error: Option<ConnectionError>,
    retry: Option<RetryState>,
    socket: Option<SocketId>,
    socket_open: bool,
    connecting: bool,
    intentional: HashSet<SocketId>,
    next_socket: u64,
    emitter: Option<Arc<EventEmitter>>,
    connected_at: Option<Instant>,
    torn_down: bool,
    stats: TransportStatistics,
}

impl ConnectionMachine {
    /// Create an idle machine.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            status: ConnectionStatus::Idle,
            error: None,
            retry: None,
            socket: None,
            socket_open: false,
            connecting: false,
            intentional: HashSet::new(),
            next_socket: 1,
            emitter: None,
            connected_at: None,
            torn_down: false,
            stats: TransportStatistics::default(),
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Why the connection is down, if it is.
    pub fn error(&self) -> Option<&ConnectionError> {
        self.error.as_ref()
    }

    /// Pending retry countdown.
    pub fn retry_state(&self) -> Option<RetryState> {
        self.retry
    }

    /// The live emitter. Only available while connected.
    pub fn emitter(&self) -> Option<Arc<EventEmitter>> {
        if self.status.is_connected() {
            self.emitter.clone()
        } else {
            None
        }
    }

    /// Counters since creation.
    pub fn statistics(&self) -> TransportStatistics {
        self.stats
    }

    /// Time the current connection opened.
    pub fn connected_at(&self) -> Option<Instant> {
        self.connected_at
    }

    /// Whether the machine has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Snapshot for display.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            status: self.status,
            error: self.error.as_ref().map(ToString::to_string),
            retry: self.retry,
        }
    }

    /// Open a new connection.
    ///
    /// Ignored while an attempt is in flight or the socket is open.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();

        if self.torn_down {
            debug!("Connection torn down, ignoring connect");
            return actions;
        }
        if self.connecting || self.socket_open {
            debug!("Already connecting or connected, ignoring connect");
            return actions;
        }

        self.cancel_retry(&mut actions);
        self.close_socket(&mut actions);

        let socket = SocketId(self.next_socket);
        self.next_socket += 1;
        self.socket = Some(socket);
        self.connecting = true;
        self.emitter = Some(Arc::new(EventEmitter::new()));
        self.stats.connection_attempts += 1;
        self.transition(ConnectionStatus::Connecting, None);

        info!(%socket, "Connecting to event stream");
        actions.push(ConnectionAction::Open { socket });
        actions
    }

    /// User-triggered reconnect. Always permitted.
    pub fn retry(&mut self) -> Vec<ConnectionAction> {
        if self.torn_down {
            return Vec::new();
        }

        info!(status = self.status.name(), "Manual retry");
        let mut actions = Vec::new();
        self.connecting = false;
        self.cancel_retry(&mut actions);
        self.close_socket(&mut actions);
        actions.extend(self.connect());
        actions
    }

    /// Release everything. Final: later inputs are ignored.
    pub fn teardown(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.torn_down {
            return actions;
        }

        debug!("Tearing down connection");
        self.torn_down = true;
        self.cancel_retry(&mut actions);
        self.close_socket(&mut actions);
        self.connecting = false;
        self.emitter = None;
        self.connected_at = None;
        self.transition(ConnectionStatus::Idle, None);
        actions
    }

    /// Countdown tick, once per second while a retry is pending.
    pub fn tick(&mut self) -> Vec<ConnectionAction> {
        if self.torn_down {
            return Vec::new();
        }
        let Some(retry) = self.retry.as_mut() else {
            return Vec::new();
        };
        if !retry.tick() {
            return Vec::new();
        }

        debug!("Retry countdown elapsed");
        self.retry = None;
        let mut actions = vec![ConnectionAction::StopTimer];
        actions.extend(self.connect());
        actions
    }

    /// The socket finished its handshake.
    pub fn on_open(&mut self, socket: SocketId) -> Vec<ConnectionAction> {
        if !self.is_current(socket) {
            debug!(%socket, "Ignoring open of superseded socket");
            return Vec::new();
        }

        self.connecting = false;
        self.socket_open = true;
        self.connected_at = Some(Instant::now());
        self.transition(ConnectionStatus::Connected, None);
        info!(%socket, "Event stream connected");
        Vec::new()
    }

    /// A text frame arrived. Returns the number of events dispatched.
    pub fn on_message(&mut self, socket: SocketId, text: &str) -> usize {
        if !self.accepts_frames(socket) {
            return 0;
        }
        let bundle = parse_bundle(text);
        self.dispatch(bundle)
    }

    /// A binary frame arrived. Returns the number of events dispatched.
    pub fn on_binary(&mut self, socket: SocketId, payload: &Bytes) -> usize {
        if !self.accepts_frames(socket) {
            return 0;
        }
        let bundle = decode_frame(payload);
        self.dispatch(bundle)
    }

    /// The socket reported an error. No close code is known yet.
    pub fn on_error(&mut self, socket: SocketId, detail: &str) -> Vec<ConnectionAction> {
        if !self.is_current(socket) {
            debug!(%socket, detail, "Ignoring error of superseded socket");
            return Vec::new();
        }

        warn!(%socket, detail, "Socket error");
        self.connecting = false;
        self.transition(ConnectionStatus::Error, Some(ConnectionError::Socket));
        Vec::new()
    }

    /// The socket closed with `code`.
    pub fn on_close(&mut self, socket: SocketId, code: u16) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();

        if self.intentional.remove(&socket) {
            debug!(%socket, code, "Intentional close consumed");
            return actions;
        }
        if !self.is_current(socket) {
            debug!(%socket, code, "Ignoring close of superseded socket");
            return actions;
        }

        self.socket = None;
        self.socket_open = false;
        self.connecting = false;
        self.emitter = None;
        self.connected_at = None;

        let kind = CloseKind::from_code(code);
        let status = match kind {
            CloseKind::Offline => ConnectionStatus::Offline,
            CloseKind::Unauthorized | CloseKind::Transient(_) => ConnectionStatus::Error,
        };
        self.transition(status, Some(kind.error()));

        if self.policy.should_retry(kind) {
            info!(
                %socket,
                code,
                retry_in = self.policy.interval_secs,
                "Connection closed, scheduling retry"
            );
            self.retry = Some(RetryState::new(self.policy.interval_secs));
            actions.push(ConnectionAction::StartTimer);
        } else {
            warn!(%socket, code, "Connection rejected, not retrying");
        }
        actions
    }

    fn is_current(&self, socket: SocketId) -> bool {
        !self.torn_down && self.socket == Some(socket) && !self.intentional.contains(&socket)
    }

    fn accepts_frames(&self, socket: SocketId) -> bool {
        self.is_current(socket) && self.socket_open
    }

    fn dispatch(&mut self, bundle: TransportResult<ClientMessageBundle>) -> usize {
        self.stats.frames_received += 1;

        let bundle = match bundle {
            Ok(bundle) => bundle,
            Err(e) => {
                self.stats.parse_failures += 1;
                warn!(error = %e, "Dropping malformed frame");
                return 0;
            }
        };

        let Some(emitter) = self.emitter.clone() else {
            return 0;
        };
        for message in &bundle.messages {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                emitter.emit(&message.kind, &message.data);
            }));
            if let Err(payload) = result {
                self.stats.handler_failures += 1;
                warn!(
                    event = %message.kind,
                    reason = panic_message(payload.as_ref()),
                    "Event handler panicked"
                );
            }
        }
        let count = bundle.messages.len();
        self.stats.events_dispatched += count as u64;
        count
    }

    fn cancel_retry(&mut self, actions: &mut Vec<ConnectionAction>) {
        if self.retry.take().is_some() {
            actions.push(ConnectionAction::StopTimer);
        }
    }

    fn close_socket(&mut self, actions: &mut Vec<ConnectionAction>) {
        if let Some(socket) = self.socket.take() {
            debug!(%socket, "Closing socket");
            self.intentional.insert(socket);
            self.socket_open = false;
            actions.push(ConnectionAction::Close { socket });
        }
    }

    fn transition(&mut self, status: ConnectionStatus, error: Option<ConnectionError>) {
        if self.status != status {
            debug!(
                previous = self.status.name(),
                current = status.name(),
                "Connection status transition"
            );
        }
        self.status = status;
        self.error = error;
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
