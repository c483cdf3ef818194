//! Announces viewers joining the stream.

use serde_json::{json, Value};

use overlay_loader::ModuleExports;
use overlay_sdk::{create_mount, OverlayComponent, RenderContext};

use super::{config_number, display_name};

#[derive(Debug, Clone, PartialEq)]
struct JoinEvent {
    nickname: String,
    profile_url: String,
}

/// Shows the most recent join.
#[derive(Default)]
struct JoinNotification {
    current: Option<JoinEvent>,
}

impl OverlayComponent for JoinNotification {
    fn subscriptions(&self) -> &'static [&'static str] {
        &["WebcastMemberMessage"]
    }

    fn handle_event(&mut self, _event_name: &str, data: &Value) -> bool {
        let user = &data["user"];
        if !user.is_object() {
            return false;
        }

        let profile_url = match &user["profilePicture"]["url"] {
            Value::Array(urls) => urls.first().and_then(Value::as_str).unwrap_or(""),
            url => url.as_str().unwrap_or(""),
        };
        self.current = Some(JoinEvent {
            nickname: display_name(user).to_string(),
            profile_url: profile_url.to_string(),
        });
        true
    }

    fn render(&self, ctx: &RenderContext<'_>) -> String {
        let Some(join) = &self.current else {
            return String::new();
        };

        let font_size = config_number(ctx.config, "fontSize", 48);
        let image_size = config_number(ctx.config, "imageSize", 200);
        let display_time = config_number(ctx.config, "displayTime", 3000);

        let mut frame = format!("{} joined the stream!", join.nickname);
        if !join.profile_url.is_empty() {
            frame.push_str(&format!("\n[{image_size}px] {}", join.profile_url));
        }
        frame.push_str(&format!("\n({font_size}px, {display_time}ms)"));
        frame
    }
}

fn manifest() -> Value {
    json!({
        "config": {
            "timing": {
                "label": "Timing",
                "options": [
                    {"key": "fadeIn", "type": "number", "label": "Fade In (ms)", "default": 500, "min": 100, "max": 2000},
                    {"key": "fadeOut", "type": "number", "label": "Fade Out (ms)", "default": 500, "min": 100, "max": 2000},
                    {"key": "displayTime", "type": "number", "label": "Display Time (ms)", "default": 3000, "min": 1000, "max": 10000}
                ]
            },
            "appearance": {
                "label": "Appearance",
                "options": [
                    {"key": "fontSize", "type": "number", "label": "Font Size", "default": 48, "min": 16, "max": 120},
                    {"key": "imageSize", "type": "number", "label": "Image Size", "default": 200, "min": 50, "max": 500}
                ]
            }
        }
    })
}

pub fn exports() -> ModuleExports {
    ModuleExports::new(create_mount(JoinNotification::default)).with_manifest(manifest())
}
