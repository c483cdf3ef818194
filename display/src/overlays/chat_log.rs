//! Rolling log of chat comments.

use std::collections::VecDeque;

use serde_json::{json, Value};

use overlay_loader::ModuleExports;
use overlay_sdk::{create_mount, OverlayComponent, RenderContext};

use super::{config_number, display_name};

/// Upper bound on retained comments, whatever `maxMessages` says.
const HISTORY_LIMIT: usize = 50;

#[derive(Default)]
struct ChatLog {
    lines: VecDeque<(String, String)>,
}

impl OverlayComponent for ChatLog {
    fn subscriptions(&self) -> &'static [&'static str] {
        &["WebcastChatMessage", "WebcastEmoteChatMessage"]
    }

    fn handle_event(&mut self, event_name: &str, data: &Value) -> bool {
        let text = match event_name {
            "WebcastEmoteChatMessage" => "[emote]".to_string(),
            _ => match data["comment"].as_str() {
                Some(comment) if !comment.is_empty() => comment.to_string(),
                _ => return false,
            },
        };

        if self.lines.len() == HISTORY_LIMIT {
            self.lines.pop_front();
        }
        self.lines
            .push_back((display_name(&data["user"]).to_string(), text));
        true
    }

    fn render(&self, ctx: &RenderContext<'_>) -> String {
        let max = config_number(ctx.config, "maxMessages", 5) as usize;
        let show_usernames = ctx
            .config
            .get("showUsernames")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let skip = self.lines.len().saturating_sub(max);
        self.lines
            .iter()
            .skip(skip)
            .map(|(user, text)| {
                if show_usernames {
                    format!("{user}: {text}")
                } else {
                    text.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn manifest() -> Value {
    json!({
        "config": {
            "layout": {
                "label": "Layout",
                "options": [
                    {"key": "maxMessages", "type": "number", "label": "Visible Messages", "default": 5, "min": 1, "max": 50},
                    {"key": "showUsernames", "type": "boolean", "label": "Show Usernames", "default": true}
                ]
            }
        }
    })
}

pub fn exports() -> ModuleExports {
    ModuleExports::new(create_mount(ChatLog::default)).with_manifest(manifest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_sdk::OverlayConfig;

    fn chat(nickname: &str, comment: &str) -> Value {
        json!({"user": {"nickname": nickname}, "comment": comment})
    }

    #[test]
    fn test_keeps_latest_messages() {
        let mut log = ChatLog::default();
        for i in 0..4 {
            assert!(log.handle_event("WebcastChatMessage", &chat("ada", &format!("m{i}"))));
        }

        let mut config = OverlayConfig::new();
        config.insert("maxMessages".to_string(), json!(2));

        assert_eq!(log.render(&RenderContext { config: &config }), "ada: m2\nada: m3");

        config.insert("showUsernames".to_string(), json!(false));
        assert_eq!(log.render(&RenderContext { config: &config }), "m2\nm3");
    }

    #[test]
    fn test_history_is_bounded() {
        let mut log = ChatLog::default();
        for i in 0..(HISTORY_LIMIT + 10) {
            log.handle_event("WebcastChatMessage", &chat("bob", &i.to_string()));
        }

        assert_eq!(log.lines.len(), HISTORY_LIMIT);
        assert_eq!(log.lines.front().map(|(_, text)| text.as_str()), Some("10"));
    }

    #[test]
    fn test_skips_empty_comments() {
        let mut log = ChatLog::default();

        assert!(!log.handle_event("WebcastChatMessage", &chat("ada", "")));
        assert!(log.handle_event("WebcastEmoteChatMessage", &json!({"user": {}})));
        assert_eq!(
            log.render(&RenderContext { config: &OverlayConfig::new() }),
            "Anonymous: [emote]"
        );
    }
}
