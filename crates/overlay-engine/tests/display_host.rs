//! Display host against a local event stream server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};

use overlay_engine::create_host;
use overlay_ipc::{
    ConnectionConfig, ConnectionStatus, DisplayConfig, HostCommand, HostEvent, OverlayState,
};
use overlay_loader::{ModuleExports, OverlayRegistry};
use overlay_sdk::{create_mount, OverlayComponent, RenderContext, Surface};
use overlay_transport::NOT_LIVE;

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingSurface {
    frames: Mutex<Vec<String>>,
    clears: Mutex<u32>,
}

impl Surface for RecordingSurface {
    fn present(&self, frame: &str) {
        self.frames.lock().push(frame.to_string());
    }

    fn clear(&self) {
        *self.clears.lock() += 1;
    }
}

#[derive(Default)]
struct Welcome {
    last: Option<String>,
}

impl OverlayComponent for Welcome {
    fn subscriptions(&self) -> &'static [&'static str] {
        &["WebcastMemberMessage"]
    }

    fn handle_event(&mut self, _event_name: &str, data: &Value) -> bool {
        self.last = data["user"]["nickname"].as_str().map(str::to_string);
        true
    }

    fn render(&self, ctx: &RenderContext<'_>) -> String {
        let greeting = ctx.config.get("greeting").and_then(Value::as_str).unwrap_or("");
        format!("{greeting} {}", self.last.as_deref().unwrap_or(""))
    }
}

/// One scripted session: a member event on the first signal, close 4404 on
/// the second. Later connections are held open.
fn spawn_server() -> (SocketAddr, mpsc::UnboundedSender<()>) {
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    let (go_tx, mut go_rx) = mpsc::unbounded_channel::<()>();

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            go_rx.recv().await.unwrap();
            let bundle = json!({
                "messages": [
                    {"type": "WebcastMemberMessage", "data": {"user": {"nickname": "ada"}}},
                    {"type": "notForOverlays", "data": {}}
                ]
            });
            ws.send(Message::text(bundle.to_string())).await.unwrap();

            go_rx.recv().await.unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::from(NOT_LIVE),
                reason: "".into(),
            }))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}

            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });
                }
            }
        });
    });

    (addr_rx.recv().unwrap(), go_tx)
}

fn wait_for_event(events: &Receiver<HostEvent>, predicate: impl Fn(&HostEvent) -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) if predicate(&event) => return,
            Ok(_) => {}
            Err(e) => panic!("expected event not received: {}", e),
        }
    }
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_overlay_follows_connection() {
    let (addr, go) = spawn_server();

    let registry = Arc::new(OverlayRegistry::new());
    registry.register(
        "builtin://welcome",
        ModuleExports::new(create_mount(Welcome::default)).with_manifest(json!({
            "config": {
                "text": {
                    "label": "Text",
                    "options": [
                        {"key": "greeting", "type": "string", "label": "Greeting", "default": "Welcome"}
                    ]
                }
            }
        })),
    );
    let surface = Arc::new(RecordingSurface::default());

    let (command_tx, command_rx) = overlay_ipc::command_channel();
    let (event_tx, event_rx) = overlay_ipc::event_channel();
    let host_surface: Arc<dyn Surface> = surface.clone();
    let host = thread::spawn(move || {
        let mut host = create_host(command_rx, event_tx, registry, host_surface);
        host.run();
    });

    wait_for_event(&event_rx, |e| matches!(e, HostEvent::Ready));

    let config = DisplayConfig {
        connection: ConnectionConfig {
            endpoint: format!("ws://{}", addr),
            unique_id: "streamer".to_string(),
            jwt_key: "key".to_string(),
            retry_interval_secs: 30,
            ..Default::default()
        },
        bundle_url: "builtin://welcome".to_string(),
        ..Default::default()
    };
    command_tx.send(HostCommand::Start { config }).unwrap();
    wait_for_event(&event_rx, |e| {
        matches!(e, HostEvent::OverlayChanged(OverlayState::Mounted))
    });

    go.send(()).unwrap();
    wait_until("member event render", || {
        surface.frames.lock().iter().any(|f| f == "Welcome ada")
    });

    let mut overrides = overlay_ipc::OverlayConfig::new();
    overrides.insert("greeting".to_string(), json!("Hi"));
    command_tx.send(HostCommand::UpdateConfig(overrides)).unwrap();
    wait_until("config update render", || {
        surface.frames.lock().last().map(String::as_str) == Some("Hi ada")
    });
    assert_eq!(*surface.clears.lock(), 0);

    go.send(()).unwrap();
    wait_for_event(&event_rx, |e| match e {
        HostEvent::ConnectionChanged { current, .. } => {
            current.status == ConnectionStatus::Offline && current.retry_countdown() == 30
        }
        _ => false,
    });
    wait_for_event(&event_rx, |e| {
        matches!(e, HostEvent::OverlayChanged(OverlayState::Loaded))
    });
    assert_eq!(*surface.clears.lock(), 1);

    command_tx.send(HostCommand::GetState).unwrap();
    wait_for_event(&event_rx, |e| match e {
        HostEvent::State(state) => {
            state.connection.status == ConnectionStatus::Offline
                && state.overlay == OverlayState::Loaded
        }
        _ => false,
    });

    command_tx.send(HostCommand::Shutdown).unwrap();
    wait_for_event(&event_rx, |e| matches!(e, HostEvent::Shutdown));
    host.join().unwrap();
}

#[test]
fn test_stop_closes_connection_before_unmount() {
    let (addr, _go) = spawn_server();

    let registry = Arc::new(OverlayRegistry::new());
    registry.register(
        "builtin://welcome",
        ModuleExports::new(create_mount(Welcome::default)),
    );
    let surface = Arc::new(RecordingSurface::default());

    let (command_tx, command_rx) = overlay_ipc::command_channel();
    let (event_tx, event_rx) = overlay_ipc::event_channel();
    let host_surface: Arc<dyn Surface> = surface.clone();
    let host = thread::spawn(move || {
        let mut host = create_host(command_rx, event_tx, registry, host_surface);
        host.run();
    });

    let config = DisplayConfig {
        connection: ConnectionConfig {
            endpoint: format!("ws://{}", addr),
            unique_id: "streamer".to_string(),
            jwt_key: "key".to_string(),
            ..Default::default()
        },
        bundle_url: "builtin://welcome".to_string(),
        ..Default::default()
    };
    command_tx.send(HostCommand::Start { config }).unwrap();
    wait_for_event(&event_rx, |e| {
        matches!(e, HostEvent::OverlayChanged(OverlayState::Mounted))
    });

    command_tx.send(HostCommand::Stop).unwrap();

    let mut idle_seen = false;
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match event_rx.recv_timeout(remaining) {
            Ok(HostEvent::ConnectionChanged { current, .. }) => {
                idle_seen |= current.status == ConnectionStatus::Idle;
            }
            Ok(HostEvent::OverlayChanged(OverlayState::Loaded)) => break,
            Ok(_) => {}
            Err(e) => panic!("overlay was not unmounted: {}", e),
        }
    }
    assert!(idle_seen, "connection closed after the overlay was unmounted");
    assert_eq!(*surface.clears.lock(), 1);

    let frames = surface.frames.lock().len();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(surface.frames.lock().len(), frames);

    command_tx.send(HostCommand::Shutdown).unwrap();
    wait_for_event(&event_rx, |e| matches!(e, HostEvent::Shutdown));
    host.join().unwrap();
}
