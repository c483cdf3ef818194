//! Display host run loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, instrument, warn};

use overlay_ipc::{DisplayConfig, HostCommand, HostEvent, HostState, OverlayConfig};
use overlay_loader::ModuleSource;
use overlay_sdk::Surface;
use overlay_transport::{ConnectionEvent, WebcastClient};

use crate::error::EngineError;
use crate::metrics::StatsReporter;
use crate::state::OverlaySession;

/// How long the loop waits for input before running periodic work.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Keeps the event stream connected and the overlay mounted while it is.
pub struct DisplayHost {
    command_rx: Receiver<HostCommand>,
    event_tx: Sender<HostEvent>,
    connection_tx: Sender<ConnectionEvent>,
    connection_rx: Receiver<ConnectionEvent>,
    surface: Arc<dyn Surface>,
    session: OverlaySession,
    client: Option<WebcastClient>,
    stats: StatsReporter,
}

impl DisplayHost {
    /// Create a new host.
    pub fn new(
        command_rx: Receiver<HostCommand>,
        event_tx: Sender<HostEvent>,
        source: Arc<dyn ModuleSource>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let (connection_tx, connection_rx) = crossbeam_channel::unbounded();

        Self {
            command_rx,
            event_tx,
            connection_tx,
            connection_rx,
            surface,
            session: OverlaySession::new(source),
            client: None,
            stats: StatsReporter::default(),
        }
    }

    /// Run the host (blocking).
    #[instrument(name = "host_run", skip(self))]
    pub fn run(&mut self) {
        info!("Display host starting");
        self.send_event(HostEvent::Ready);

        let command_rx = self.command_rx.clone();
        let connection_rx = self.connection_rx.clone();

        loop {
            crossbeam_channel::select! {
                recv(command_rx) -> command => match command {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Command channel disconnected, shutting down");
                        self.stop();
                        break;
                    }
                },
                recv(connection_rx) -> event => {
                    if let Ok(event) = event {
                        self.handle_connection_event(event);
                    }
                }
                default(TICK_INTERVAL) => self.on_tick(),
            }
        }

        info!("Display host stopped");
    }

    /// Handle a command. Returns false if the host should stop.
    fn handle_command(&mut self, command: HostCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            HostCommand::Start { config } => self.start(config),
            HostCommand::Retry => self.retry(),
            HostCommand::UpdateConfig(config) => self.update_config(config),
            HostCommand::GetState => self.send_state(),
            HostCommand::Stop => self.stop(),
            HostCommand::Shutdown => {
                self.stop();
                self.send_event(HostEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Start the connection for `config`.
    #[instrument(name = "host_start", skip(self, config))]
    fn start(&mut self, config: DisplayConfig) {
        if self.client.as_ref().is_some_and(WebcastClient::is_running) {
            debug!("Already started, ignoring start command");
            return;
        }

        if let Err(e) = self.try_start(&config) {
            error!("Start failed: {}", e);
            self.send_error(&e);
        }
    }

    fn try_start(&mut self, config: &DisplayConfig) -> Result<(), EngineError> {
        if config.bundle_url.trim().is_empty() {
            return Err(EngineError::NoBundle);
        }

        let mut client = WebcastClient::new(&config.connection)?;
        self.session.configure(config);
        self.send_event(HostEvent::OverlayChanged(self.session.state().clone()));

        client.start(self.connection_tx.clone())?;
        info!(bundle = %config.bundle_url, "Display host started");
        self.client = Some(client);
        Ok(())
    }

    fn retry(&mut self) {
        let result = match &self.client {
            Some(client) => client.retry().map_err(EngineError::from),
            None => Err(EngineError::NotStarted),
        };
        if let Err(e) = result {
            warn!("Retry failed: {}", e);
            self.send_error(&e);
        }
    }

    fn update_config(&mut self, config: OverlayConfig) {
        self.session.update_overrides(config);
    }

    /// Tear the connection down and unmount the overlay.
    #[instrument(name = "host_stop", skip(self))]
    fn stop(&mut self) {
        if let Some(mut client) = self.client.take() {
            info!("Stopping connection");
            client.shutdown();
        }

        // Forward the final snapshot published during shutdown.
        while let Ok(event) = self.connection_rx.try_recv() {
            self.handle_connection_event(event);
        }

        // The connection thread has exited, so nothing can render after this.
        self.unmount_overlay();
    }

    fn handle_connection_event(&mut self, event: ConnectionEvent) {
        let ConnectionEvent::Changed { previous, current } = event;

        let was_connected = previous.status.is_connected();
        let is_connected = current.status.is_connected();

        self.send_event(HostEvent::ConnectionChanged {
            previous: Box::new(previous),
            current: Box::new(current),
        });

        if is_connected && !was_connected {
            self.stats.reset();
            self.mount_overlay();
        } else if was_connected && !is_connected {
            self.unmount_overlay();
        }
    }

    fn mount_overlay(&mut self) {
        let Some(emitter) = self.client.as_ref().and_then(WebcastClient::emitter) else {
            debug!("Connection has no emitter, not mounting");
            return;
        };

        let before = self.session.state().clone();
        let result = self.session.mount(Arc::clone(&self.surface), &emitter);

        let after = self.session.state().clone();
        if after != before {
            self.send_event(HostEvent::OverlayChanged(after));
        }

        if let Err(e) = result {
            error!("Overlay mount failed: {}", e);
            self.send_error(&e);
        }
    }

    fn unmount_overlay(&mut self) {
        if !self.session.state().is_mounted() {
            return;
        }
        self.session.unmount();
        self.send_event(HostEvent::OverlayChanged(self.session.state().clone()));
    }

    fn on_tick(&mut self) {
        let Some(client) = &self.client else {
            return;
        };
        if !client.snapshot().status.is_connected() {
            return;
        }

        let now = Instant::now();
        if self.stats.is_due(now) {
            let stats = self
                .stats
                .report(client.statistics(), client.connected_at(), now);
            self.send_event(HostEvent::Stats(stats));
        }
    }

    fn send_state(&self) {
        let connection = self
            .client
            .as_ref()
            .map(WebcastClient::snapshot)
            .unwrap_or_default();

        self.send_event(HostEvent::State(HostState {
            connection,
            overlay: self.session.state().clone(),
        }));
    }

    fn send_error(&self, error: &EngineError) {
        self.send_event(HostEvent::Error {
            recoverable: false,
            message: error.to_string(),
        });
    }

    fn send_event(&self, event: HostEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl Drop for DisplayHost {
    fn drop(&mut self) {
        self.session.unmount();
        if let Some(mut client) = self.client.take() {
            client.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_ipc::{ConnectionConfig, ConnectionStatus, OverlayState};
    use overlay_loader::OverlayRegistry;

    struct NullSurface;

    impl Surface for NullSurface {
        fn present(&self, _frame: &str) {}
        fn clear(&self) {}
    }

    fn host() -> (DisplayHost, Sender<HostCommand>, Receiver<HostEvent>) {
        let (command_tx, command_rx) = overlay_ipc::command_channel();
        let (event_tx, event_rx) = overlay_ipc::event_channel();
        let host = DisplayHost::new(
            command_rx,
            event_tx,
            Arc::new(OverlayRegistry::new()),
            Arc::new(NullSurface),
        );
        (host, command_tx, event_rx)
    }

    fn drain(events: &Receiver<HostEvent>) -> Vec<HostEvent> {
        events.try_iter().collect()
    }

    #[test]
    fn test_state_before_start() {
        let (mut host, _commands, events) = host();

        assert!(host.handle_command(HostCommand::GetState));

        match drain(&events).as_slice() {
            [HostEvent::State(state)] => {
                assert_eq!(state.connection.status, ConnectionStatus::Idle);
                assert_eq!(state.overlay, OverlayState::NotLoaded);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_start_requires_credentials() {
        let (mut host, _commands, events) = host();
        let config = DisplayConfig {
            bundle_url: "builtin://chat-log".to_string(),
            connection: ConnectionConfig::default(),
            ..Default::default()
        };

        host.handle_command(HostCommand::Start { config });

        match drain(&events).as_slice() {
            [HostEvent::Error {
                recoverable,
                message,
            }] => {
                assert!(!recoverable);
                assert!(message.contains("credentials"), "{message}");
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(host.client.is_none());
    }

    #[test]
    fn test_start_requires_bundle() {
        let (mut host, _commands, events) = host();
        let config = DisplayConfig {
            connection: ConnectionConfig {
                unique_id: "streamer".to_string(),
                jwt_key: "key".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        host.handle_command(HostCommand::Start { config });

        assert!(matches!(
            drain(&events).as_slice(),
            [HostEvent::Error { message, .. }] if message == "No overlay bundle configured"
        ));
    }

    #[test]
    fn test_retry_before_start() {
        let (mut host, _commands, events) = host();

        host.handle_command(HostCommand::Retry);

        assert!(matches!(
            drain(&events).as_slice(),
            [HostEvent::Error { message, .. }] if message == "Display host not started"
        ));
    }

    #[test]
    fn test_shutdown_ends_loop() {
        let (mut host, commands, events) = host();
        commands.send(HostCommand::Shutdown).unwrap();

        host.run();

        let events = drain(&events);
        assert!(matches!(events.first(), Some(HostEvent::Ready)));
        assert!(matches!(events.last(), Some(HostEvent::Shutdown)));
    }
}
