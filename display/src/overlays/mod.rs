//! Overlays compiled into the display binary.

mod chat_log;
mod join_notification;

use overlay_loader::OverlayRegistry;

/// Bundle URL of the chat log overlay.
pub const CHAT_LOG_URL: &str = "builtin://chat-log";

/// Bundle URL of the join notification overlay.
pub const JOIN_NOTIFICATION_URL: &str = "builtin://join-notification";

/// Register every built-in overlay.
pub fn register_builtin(registry: &OverlayRegistry) {
    registry.register(CHAT_LOG_URL, chat_log::exports());
    registry.register(JOIN_NOTIFICATION_URL, join_notification::exports());
}

/// Display name of a user object, falling back to the unique id.
fn display_name(user: &serde_json::Value) -> &str {
    user["nickname"]
        .as_str()
        .filter(|name| !name.is_empty())
        .or_else(|| user["uniqueId"].as_str().filter(|id| !id.is_empty()))
        .unwrap_or("Anonymous")
}

/// Positive integer option, falling back when missing or zero.
fn config_number(config: &overlay_sdk::OverlayConfig, key: &str, fallback: u64) -> u64 {
    config
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
        .unwrap_or(fallback)
}
