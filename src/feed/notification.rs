//! EventSub wire shapes and their projection into classifier input.
//!
//! The websocket delivers an envelope whose payload shape depends on
//! `metadata.message_type`; notification payloads further branch on the
//! subscription type. Only the fields the classifier needs survive the
//! projection — everything else in the payload is ignored.

use serde::Deserialize;
use serde_json::Value;

/// Outer EventSub websocket envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub metadata: Metadata,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct Metadata {
    pub message_type: String,
    #[serde(default)]
    pub subscription_type: Option<String>,
}

/// One inbound notification, normalized to what the classifier consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Chat(ChatMessage),
    Subscription(SubNotice),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub chatter_login: String,
    /// Badge set ids (`moderator`, `broadcaster`, `subscriber`, ...).
    pub badges: Vec<String>,
    /// Message text, trimmed.
    pub text: String,
    pub bits: Option<u64>,
}

/// A structured subscription signal. The tier code stays raw here; the
/// classifier owns the code → tier mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SubNotice {
    pub tier_code: String,
    pub count: u32,
}

#[derive(Debug, Deserialize)]
struct WireBadge {
    set_id: String,
}

#[derive(Debug, Deserialize)]
struct WireMessageBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireCheer {
    bits: u64,
}

#[derive(Debug, Deserialize)]
struct WireChatEvent {
    chatter_user_login: String,
    #[serde(default)]
    badges: Vec<WireBadge>,
    message: WireMessageBody,
    #[serde(default)]
    cheer: Option<WireCheer>,
}

#[derive(Debug, Deserialize)]
struct WireSubEvent {
    tier: String,
}

#[derive(Debug, Deserialize)]
struct WireGiftEvent {
    tier: String,
    total: u32,
}

/// Project a notification payload's `event` object into a [`Notification`].
/// Unknown subscription types and shapes that fail to deserialize yield
/// `None`; the feed drops them with a trace log.
pub fn from_event(subscription_type: &str, event: &Value) -> Option<Notification> {
    match subscription_type {
        "channel.chat.message" => {
            let wire: WireChatEvent = serde_json::from_value(event.clone()).ok()?;
            Some(Notification::Chat(ChatMessage {
                chatter_login: wire.chatter_user_login,
                badges: wire.badges.into_iter().map(|b| b.set_id).collect(),
                text: wire.message.text.trim().to_string(),
                bits: wire.cheer.map(|c| c.bits),
            }))
        }
        // Plain subs and resubs imply a count of one; the gift payload
        // carries its recipient total.
        "channel.subscribe" | "channel.subscription.message" => {
            let wire: WireSubEvent = serde_json::from_value(event.clone()).ok()?;
            Some(Notification::Subscription(SubNotice {
                tier_code: wire.tier,
                count: 1,
            }))
        }
        "channel.subscription.gift" => {
            let wire: WireGiftEvent = serde_json::from_value(event.clone()).ok()?;
            Some(Notification::Subscription(SubNotice {
                tier_code: wire.tier,
                count: wire.total,
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_event_projects() {
        let event = json!({
            "chatter_user_login": "kmrkle",
            "badges": [{"set_id": "moderator", "id": "1", "info": ""}],
            "message": {"text": "  !hm get  ", "fragments": []},
            "cheer": null,
            "color": "#FF0000"
        });
        let note = from_event("channel.chat.message", &event).unwrap();
        assert_eq!(
            note,
            Notification::Chat(ChatMessage {
                chatter_login: "kmrkle".to_string(),
                badges: vec!["moderator".to_string()],
                text: "!hm get".to_string(),
                bits: None,
            })
        );
    }

    #[test]
    fn test_cheer_bits_extracted() {
        let event = json!({
            "chatter_user_login": "viewer",
            "badges": [],
            "message": {"text": "cheer100 hype!"},
            "cheer": {"bits": 100}
        });
        let note = from_event("channel.chat.message", &event).unwrap();
        match note {
            Notification::Chat(msg) => assert_eq!(msg.bits, Some(100)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sub_and_resub_imply_count_one() {
        let event = json!({"user_login": "viewer", "tier": "2000", "is_gift": false});
        for kind in ["channel.subscribe", "channel.subscription.message"] {
            let note = from_event(kind, &event).unwrap();
            assert_eq!(
                note,
                Notification::Subscription(SubNotice {
                    tier_code: "2000".to_string(),
                    count: 1,
                })
            );
        }
    }

    #[test]
    fn test_gift_carries_total() {
        let event = json!({"user_login": "gifter", "tier": "1000", "total": 5});
        let note = from_event("channel.subscription.gift", &event).unwrap();
        assert_eq!(
            note,
            Notification::Subscription(SubNotice {
                tier_code: "1000".to_string(),
                count: 5,
            })
        );
    }

    #[test]
    fn test_unknown_type_dropped() {
        assert_eq!(from_event("channel.follow", &json!({})), None);
    }

    #[test]
    fn test_malformed_payload_dropped() {
        assert_eq!(from_event("channel.chat.message", &json!({"nope": 1})), None);
    }
}
