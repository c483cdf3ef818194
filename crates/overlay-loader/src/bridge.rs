//! Event bridge from the host emitter into a mounted overlay.

use std::sync::Arc;

use tracing::trace;

use overlay_sdk::{EventCallback, EventEmitter, SubscribeFn, SubscriptionId, Unsubscribe};

/// Event names forwarded to overlays. Anything else stays on the host side.
pub const BRIDGED_EVENTS: [&str; 41] = [
    "WebcastChatMessage",
    "WebcastGiftMessage",
    "WebcastLikeMessage",
    "WebcastMemberMessage",
    "WebcastSocialMessage",
    "WebcastRoomUserSeqMessage",
    "WebcastEmoteChatMessage",
    "WebcastLinkMicBattle",
    "WebcastLinkMicArmies",
    "WebcastQuestionNewMessage",
    "WebcastLiveIntroMessage",
    "WebcastHourlyRankMessage",
    "WebcastEnvelopeMessage",
    "WebcastSubNotifyMessage",
    "WebcastBarrageMessage",
    "WebcastRoomMessage",
    "WebcastCaptionMessage",
    "WebcastControlMessage",
    "WebcastGoalUpdateMessage",
    "WebcastImDeleteMessage",
    "WebcastInRoomBannerMessage",
    "WebcastRankUpdateMessage",
    "WebcastPollMessage",
    "WebcastRankTextMessage",
    "WebcastLinkMicBattlePunishFinish",
    "WebcastLinkmicBattleTaskMessage",
    "WebcastLinkMicFanTicketMethod",
    "WebcastLinkMicMethod",
    "WebcastUnauthorizedMemberMessage",
    "WebcastMsgDetectMessage",
    "WebcastOecLiveShoppingMessage",
    "WebcastRoomPinMessage",
    "WebcastLinkMessage",
    "WebcastLinkLayerMessage",
    "roomVerifyMessage",
    "roomInfo",
    "workerInfo",
    "SyntheticJoinMessage",
    "SyntheticLeaveMessage",
    "tiktok.connect",
    "tiktok.disconnect",
];

/// Build the `subscribe_to_events` function handed to an overlay.
///
/// Each call registers one handler per bridged event on `emitter`; the
/// returned unsubscribe removes exactly those handlers.
pub fn subscribe_bridge(emitter: Arc<EventEmitter>) -> SubscribeFn {
    Box::new(move |callback: EventCallback| {
        let subscriptions: Vec<(&'static str, SubscriptionId)> = BRIDGED_EVENTS
            .iter()
            .map(|&name| {
                let callback = Arc::clone(&callback);
                let id = emitter.on(name, move |data| callback(name, data));
                (name, id)
            })
            .collect();
        trace!(events = subscriptions.len(), "Overlay subscribed to host events");

        let emitter = Arc::clone(&emitter);
        Box::new(move || {
            for (name, id) in subscriptions {
                emitter.off(name, id);
            }
            trace!("Overlay unsubscribed from host events");
        }) as Unsubscribe
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[test]
    fn test_allow_list_is_unique() {
        let mut names = BRIDGED_EVENTS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BRIDGED_EVENTS.len());
    }

    #[test]
    fn test_forwards_only_listed_events() {
        let emitter = Arc::new(EventEmitter::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let subscribe = subscribe_bridge(Arc::clone(&emitter));

        let sink = Arc::clone(&received);
        let _unsubscribe = subscribe(Arc::new(move |name: &str, data: &Value| {
            sink.lock().push((name.to_string(), data.clone()));
        }));

        emitter.emit("WebcastChatMessage", &json!({"comment": "hi"}));
        emitter.emit("customEvent", &json!({}));
        emitter.emit("tiktok.connect", &json!(null));

        let received = received.lock();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].0, "WebcastChatMessage");
        assert_eq!(received[0].1, json!({"comment": "hi"}));
        assert_eq!(received[1].0, "tiktok.connect");
    }

    #[test]
    fn test_unsubscribe_removes_every_handler() {
        let emitter = Arc::new(EventEmitter::new());
        emitter.on("WebcastGiftMessage", |_| {});
        let subscribe = subscribe_bridge(Arc::clone(&emitter));

        let unsubscribe = subscribe(Arc::new(|_: &str, _: &Value| {}));
        assert_eq!(emitter.handler_count("WebcastGiftMessage"), 2);
        assert_eq!(emitter.handler_count("roomInfo"), 1);

        unsubscribe();
        assert_eq!(emitter.handler_count("WebcastGiftMessage"), 1);
        for name in BRIDGED_EVENTS.iter().filter(|&&n| n != "WebcastGiftMessage") {
            assert_eq!(emitter.handler_count(name), 0, "{name} still subscribed");
        }
    }
}
