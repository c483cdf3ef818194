//! WebSocket event stream client.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::Sender;
use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use overlay_ipc::{ConnectionConfig, ConnectionSnapshot};
use overlay_sdk::EventEmitter;

use crate::connection::{RetryPolicy, ABNORMAL_CLOSURE, NO_STATUS};
use crate::endpoint::build_websocket_url;
use crate::error::TransportError;
use crate::machine::{ConnectionAction, ConnectionMachine, SocketId, TransportStatistics};
use crate::TransportResult;

/// Close code recorded when we close a socket ourselves.
const NORMAL_CLOSURE: u16 = 1000;

/// How long shutdown waits for superseded sockets to finish closing.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Notification published by the client.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Status, message or countdown changed.
    Changed {
        previous: ConnectionSnapshot,
        current: ConnectionSnapshot,
    },
}

/// Commands from the public handle to the connection task.
#[derive(Debug)]
enum ClientCommand {
    Connect,
    Retry,
    Shutdown,
}

/// Lifecycle report from a socket task.
#[derive(Debug)]
struct SocketEvent {
    socket: SocketId,
    kind: SocketEventKind,
}

#[derive(Debug)]
enum SocketEventKind {
    Open,
    Text(String),
    Binary(Bytes),
    Error(String),
    Closed(u16),
}

/// State published by the connection task for other threads.
#[derive(Default)]
struct Shared {
    snapshot: RwLock<ConnectionSnapshot>,
    emitter: RwLock<Option<Arc<EventEmitter>>>,
    statistics: RwLock<TransportStatistics>,
    connected_at: RwLock<Option<std::time::Instant>>,
}

/// Reconnecting client for the live event stream.
///
/// The state machine runs on a dedicated thread with a single-threaded
/// tokio runtime, so every transition happens on one event loop.
pub struct WebcastClient {
    url: Url,
    policy: RetryPolicy,
    shared: Arc<Shared>,
    command_tx: Option<mpsc::UnboundedSender<ClientCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl WebcastClient {
    /// Create a new client. Does not connect.
    pub fn new(config: &ConnectionConfig) -> TransportResult<Self> {
        let url = build_websocket_url(config)?;

        Ok(Self {
            url,
            policy: RetryPolicy::new(config.retry_interval_secs),
            shared: Arc::new(Shared::default()),
            command_tx: None,
            worker: None,
        })
    }

    /// Start the connection task and connect.
    ///
    /// Calling this again while running is equivalent to [`connect`](Self::connect).
    #[instrument(name = "webcast_start", skip(self, event_tx))]
    pub fn start(&mut self, event_tx: Sender<ConnectionEvent>) -> TransportResult<()> {
        if self.command_tx.is_some() {
            return self.connect();
        }

        info!(host = ?self.url.host_str(), "Starting event stream client");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        command_tx
            .send(ClientCommand::Connect)
            .map_err(|_| TransportError::ChannelDisconnected)?;

        let task = ConnectionTask::new(
            self.url.clone(),
            self.policy,
            Arc::clone(&self.shared),
            event_tx,
        );

        let worker = thread::Builder::new()
            .name("webcast-connection".to_string())
            .spawn(move || runtime.block_on(task.run(command_rx)))?;

        self.command_tx = Some(command_tx);
        self.worker = Some(worker);
        Ok(())
    }

    /// Connect unless already connecting or connected.
    pub fn connect(&self) -> TransportResult<()> {
        self.send(ClientCommand::Connect)
    }

    /// Reconnect now, cancelling any retry countdown.
    pub fn retry(&self) -> TransportResult<()> {
        self.send(ClientCommand::Retry)
    }

    /// Close the socket, cancel timers and stop the connection task.
    #[instrument(name = "webcast_shutdown", skip(self))]
    pub fn shutdown(&mut self) {
        if let Some(command_tx) = self.command_tx.take() {
            let _ = command_tx.send(ClientCommand::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Connection task panicked");
            }
            info!("Event stream client stopped");
        }
    }

    /// Whether the connection task is running.
    pub fn is_running(&self) -> bool {
        self.command_tx.is_some()
    }

    /// Get the current connection snapshot.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.shared.snapshot.read().clone()
    }

    /// The live emitter, while connected.
    pub fn emitter(&self) -> Option<Arc<EventEmitter>> {
        self.shared.emitter.read().clone()
    }

    /// Counters since the client started.
    pub fn statistics(&self) -> TransportStatistics {
        *self.shared.statistics.read()
    }

    /// Time the current connection opened.
    pub fn connected_at(&self) -> Option<std::time::Instant> {
        *self.shared.connected_at.read()
    }

    /// The endpoint URL, including query parameters.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn send(&self, command: ClientCommand) -> TransportResult<()> {
        let command_tx = self.command_tx.as_ref().ok_or(TransportError::NotStarted)?;
        command_tx
            .send(command)
            .map_err(|_| TransportError::ChannelDisconnected)
    }
}

impl Drop for WebcastClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct SocketTask {
    close_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

/// Owns the machine and carries out its actions.
struct ConnectionTask {
    machine: ConnectionMachine,
    url: Url,
    policy: RetryPolicy,
    shared: Arc<Shared>,
    event_tx: Sender<ConnectionEvent>,
    published: ConnectionSnapshot,
    sockets: HashMap<SocketId, SocketTask>,
    closing: Vec<tokio::task::JoinHandle<()>>,
    ticker: Option<Interval>,
}

impl ConnectionTask {
    fn new(
        url: Url,
        policy: RetryPolicy,
        shared: Arc<Shared>,
        event_tx: Sender<ConnectionEvent>,
    ) -> Self {
        Self {
            machine: ConnectionMachine::new(policy),
            url,
            policy,
            shared,
            event_tx,
            published: ConnectionSnapshot::default(),
            sockets: HashMap::new(),
            closing: Vec::new(),
            ticker: None,
        }
    }

    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<ClientCommand>) {
        let (socket_tx, mut socket_rx) = mpsc::unbounded_channel::<SocketEvent>();

        loop {
            let mut stopping = false;

            let actions = tokio::select! {
                command = command_rx.recv() => match command {
                    Some(ClientCommand::Connect) => self.machine.connect(),
                    Some(ClientCommand::Retry) => self.machine.retry(),
                    Some(ClientCommand::Shutdown) | None => {
                        stopping = true;
                        self.machine.teardown()
                    }
                },
                Some(event) = socket_rx.recv() => self.on_socket_event(event),
                _ = next_tick(&mut self.ticker) => self.machine.tick(),
            };

            self.apply(actions, &socket_tx);
            self.publish();

            if stopping {
                break;
            }
        }

        for handle in self.closing.drain(..) {
            if time::timeout(CLOSE_GRACE, handle).await.is_err() {
                debug!("Socket did not close within grace period");
            }
        }
        debug!("Connection task stopped");
    }

    fn on_socket_event(&mut self, event: SocketEvent) -> Vec<ConnectionAction> {
        let SocketEvent { socket, kind } = event;
        match kind {
            SocketEventKind::Open => self.machine.on_open(socket),
            SocketEventKind::Text(text) => {
                self.machine.on_message(socket, &text);
                Vec::new()
            }
            SocketEventKind::Binary(payload) => {
                self.machine.on_binary(socket, &payload);
                Vec::new()
            }
            SocketEventKind::Error(detail) => self.machine.on_error(socket, &detail),
            SocketEventKind::Closed(code) => {
                self.sockets.remove(&socket);
                self.machine.on_close(socket, code)
            }
        }
    }

    fn apply(&mut self, actions: Vec<ConnectionAction>, socket_tx: &mpsc::UnboundedSender<SocketEvent>) {
        for action in actions {
            match action {
                ConnectionAction::Open { socket } => {
                    let (close_tx, close_rx) = oneshot::channel();
                    let handle = tokio::spawn(socket_task(
                        socket,
                        self.url.clone(),
                        socket_tx.clone(),
                        close_rx,
                    ));
                    self.sockets.insert(socket, SocketTask { close_tx, handle });
                }
                ConnectionAction::Close { socket } => {
                    if let Some(task) = self.sockets.remove(&socket) {
                        let _ = task.close_tx.send(());
                        self.closing.push(task.handle);
                    }
                }
                ConnectionAction::StartTimer => {
                    let period = self.policy.tick_period();
                    self.ticker = Some(time::interval_at(Instant::now() + period, period));
                }
                ConnectionAction::StopTimer => self.ticker = None,
            }
        }
        self.closing.retain(|handle| !handle.is_finished());
    }

    fn publish(&mut self) {
        *self.shared.emitter.write() = self.machine.emitter();
        *self.shared.statistics.write() = self.machine.statistics();
        *self.shared.connected_at.write() = self.machine.connected_at();

        let current = self.machine.snapshot();
        if current == self.published {
            return;
        }

        *self.shared.snapshot.write() = current.clone();
        let previous = std::mem::replace(&mut self.published, current.clone());
        if let Err(e) = self
            .event_tx
            .try_send(ConnectionEvent::Changed { previous, current })
        {
            warn!("Failed to send connection event: {}", e);
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drive one socket until it closes or is told to close.
async fn socket_task(
    socket: SocketId,
    url: Url,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let report = |kind: SocketEventKind| {
        let _ = events.send(SocketEvent { socket, kind });
    };

    let mut ws = tokio::select! {
        result = tokio_tungstenite::connect_async(url.as_str()) => match result {
            Ok((ws, _response)) => ws,
            Err(e) => {
                report(SocketEventKind::Error(e.to_string()));
                report(SocketEventKind::Closed(ABNORMAL_CLOSURE));
                return;
            }
        },
        _ = &mut close_rx => {
            report(SocketEventKind::Closed(NORMAL_CLOSURE));
            return;
        }
    };

    debug!(%socket, "WebSocket handshake complete");
    report(SocketEventKind::Open);

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                if let Err(e) = ws.close(None).await {
                    debug!(%socket, "Close handshake failed: {}", e);
                }
                report(SocketEventKind::Closed(NORMAL_CLOSURE));
                return;
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => report(SocketEventKind::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(payload))) => report(SocketEventKind::Binary(payload)),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS, |f| u16::from(f.code));
                    report(SocketEventKind::Closed(code));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    report(SocketEventKind::Error(e.to_string()));
                    report(SocketEventKind::Closed(ABNORMAL_CLOSURE));
                    return;
                }
                None => {
                    report(SocketEventKind::Closed(ABNORMAL_CLOSURE));
                    return;
                }
            }
        }
    }
}
