//! Runtime that turns an [`OverlayComponent`] into a mount function.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::debug;

use overlay_ipc::OverlayConfig;

use crate::contract::{MountFn, MountProps, OverlayHandle, Surface, Unsubscribe};
use crate::emitter::EventEmitter;

/// Context available to a component while rendering.
pub struct RenderContext<'a> {
    /// Current configuration.
    pub config: &'a OverlayConfig,
}

/// An overlay renderer driven by the SDK runtime.
pub trait OverlayComponent: Send + 'static {
    /// Event names this component listens to.
    fn subscriptions(&self) -> &'static [&'static str];

    /// Handle one event. Returns true if the component needs a re-render.
    fn handle_event(&mut self, event_name: &str, data: &Value) -> bool;

    /// Render the current state into a frame.
    fn render(&self, ctx: &RenderContext<'_>) -> String;
}

/// Build a mount function around a component factory.
///
/// Every mount gets a fresh component and its own private emitter, fed by
/// the host through `subscribe_to_events`.
pub fn create_mount<C, F>(factory: F) -> MountFn
where
    C: OverlayComponent,
    F: Fn() -> C + Send + Sync + 'static,
{
    Arc::new(move |surface: Arc<dyn Surface>, props: MountProps| {
        let MountProps {
            config,
            subscribe_to_events,
        } = props;

        let runtime = Arc::new(OverlayRuntime {
            component: Mutex::new(factory()),
            config: RwLock::new(config),
            emitter: EventEmitter::new(),
            surface,
        });

        let events = runtime.component.lock().subscriptions();
        for &name in events {
            let weak = Arc::downgrade(&runtime);
            runtime.emitter.on(name, move |data| {
                if let Some(runtime) = weak.upgrade() {
                    runtime.dispatch(name, data);
                }
            });
        }

        let forward: Weak<OverlayRuntime<C>> = Arc::downgrade(&runtime);
        let unsubscribe = subscribe_to_events(Arc::new(move |name: &str, data: &Value| {
            if let Some(runtime) = forward.upgrade() {
                runtime.emitter.emit(name, data);
            }
        }));

        runtime.render();
        debug!(events = events.len(), "Overlay mounted");

        Box::new(OverlayMount {
            runtime: Some(runtime),
            unsubscribe: Some(unsubscribe),
        }) as Box<dyn OverlayHandle>
    })
}

struct OverlayRuntime<C> {
    component: Mutex<C>,
    config: RwLock<OverlayConfig>,
    emitter: EventEmitter,
    surface: Arc<dyn Surface>,
}

impl<C: OverlayComponent> OverlayRuntime<C> {
    fn dispatch(&self, name: &str, data: &Value) {
        let changed = self.component.lock().handle_event(name, data);
        if changed {
            self.render();
        }
    }

    fn render(&self) {
        let frame = {
            let config = self.config.read();
            self.component.lock().render(&RenderContext { config: &config })
        };
        self.surface.present(&frame);
    }
}

/// Handle for a component mounted through [`create_mount`].
pub struct OverlayMount<C> {
    runtime: Option<Arc<OverlayRuntime<C>>>,
    unsubscribe: Option<Unsubscribe>,
}

impl<C: OverlayComponent> OverlayHandle for OverlayMount<C> {
    fn unmount(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.surface.clear();
            debug!("Overlay unmounted");
        }
    }

    fn update_config(&mut self, config: OverlayConfig) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        *runtime.config.write() = config;
        runtime.render();
    }
}

impl<C> Drop for OverlayMount<C> {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::EventCallback;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSurface {
        frames: Mutex<Vec<String>>,
        cleared: Mutex<u32>,
    }

    impl Surface for RecordingSurface {
        fn present(&self, frame: &str) {
            self.frames.lock().push(frame.to_string());
        }

        fn clear(&self) {
            *self.cleared.lock() += 1;
        }
    }

    #[derive(Default)]
    struct ChatCounter {
        last: Option<String>,
        count: u32,
    }

    impl OverlayComponent for ChatCounter {
        fn subscriptions(&self) -> &'static [&'static str] {
            &["Chat"]
        }

        fn handle_event(&mut self, _event_name: &str, data: &Value) -> bool {
            self.count += 1;
            self.last = data["text"].as_str().map(str::to_string);
            true
        }

        fn render(&self, ctx: &RenderContext<'_>) -> String {
            let prefix = ctx.config.get("prefix").and_then(Value::as_str).unwrap_or(">");
            format!("{prefix} {} ({})", self.last.as_deref().unwrap_or("-"), self.count)
        }
    }

    /// Host side of the bridge: a single registered callback.
    #[derive(Default)]
    struct HostBridge {
        callback: Mutex<Option<EventCallback>>,
        unsubscribed: Mutex<bool>,
    }

    impl HostBridge {
        fn props(self: &Arc<Self>, config: OverlayConfig) -> MountProps {
            let bridge = Arc::clone(self);
            MountProps {
                config,
                subscribe_to_events: Box::new(move |callback| {
                    *bridge.callback.lock() = Some(callback);
                    let bridge = Arc::clone(&bridge);
                    Box::new(move || {
                        *bridge.callback.lock() = None;
                        *bridge.unsubscribed.lock() = true;
                    })
                }),
            }
        }

        fn send(&self, name: &str, data: Value) {
            let callback = self.callback.lock().clone();
            if let Some(callback) = callback {
                callback(name, &data);
            }
        }
    }

    fn config(value: Value) -> OverlayConfig {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_mount_renders_initial_frame() {
        let mount = create_mount(ChatCounter::default);
        let surface = Arc::new(RecordingSurface::default());
        let bridge = Arc::new(HostBridge::default());

        let _handle = mount(surface.clone(), bridge.props(config(json!({"prefix": "#"}))));

        assert_eq!(*surface.frames.lock(), vec!["# - (0)".to_string()]);
    }

    #[test]
    fn test_events_flow_through_bridge() {
        let mount = create_mount(ChatCounter::default);
        let surface = Arc::new(RecordingSurface::default());
        let bridge = Arc::new(HostBridge::default());
        let _handle = mount(surface.clone(), bridge.props(OverlayConfig::new()));

        bridge.send("Chat", json!({"text": "hi"}));
        bridge.send("Gift", json!({"giftId": 1}));

        let frames = surface.frames.lock();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], "> hi (1)");
    }

    #[test]
    fn test_update_config_rerenders_without_remount() {
        let mount = create_mount(ChatCounter::default);
        let surface = Arc::new(RecordingSurface::default());
        let bridge = Arc::new(HostBridge::default());
        let mut handle = mount(surface.clone(), bridge.props(OverlayConfig::new()));

        bridge.send("Chat", json!({"text": "hello"}));
        handle.update_config(config(json!({"prefix": "!!"})));

        assert_eq!(surface.frames.lock().last().unwrap(), "!! hello (1)");
        assert_eq!(*surface.cleared.lock(), 0);
        assert!(!*bridge.unsubscribed.lock());
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let mount = create_mount(ChatCounter::default);
        let surface = Arc::new(RecordingSurface::default());
        let bridge = Arc::new(HostBridge::default());
        let mut handle = mount(surface.clone(), bridge.props(OverlayConfig::new()));

        handle.unmount();
        handle.unmount();
        handle.update_config(config(json!({"prefix": "x"})));
        bridge.send("Chat", json!({"text": "late"}));

        assert!(*bridge.unsubscribed.lock());
        assert_eq!(*surface.cleared.lock(), 1);
        assert_eq!(surface.frames.lock().len(), 1);
    }
}
