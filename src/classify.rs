//! Event Classifier: one raw notification in, zero or more normalized
//! events out.
//!
//! Authorization is decided here (badge set → moderator bit) and carried
//! on the event; monetization accrual is never gated by it. A single chat
//! notification can legitimately yield both a cheer and a command — both
//! are emitted, cheer first.

use std::sync::OnceLock;

use regex::Regex;

use crate::command;
use crate::engine::events::NormalizedEvent;
use crate::engine::state::SubDetectMode;
use crate::feed::notification::Notification;

/// Badge sets that may issue state-mutating commands.
fn is_moderator(badges: &[String]) -> bool {
    badges.iter().any(|b| b == "moderator" || b == "broadcaster")
}

/// Tier codes from structured subscription payloads. Anything
/// unrecognized maps to 0, which the reducer ignores.
fn map_tier_code(code: &str) -> u32 {
    match code {
        "1000" => 1,
        "2000" => 2,
        "3000" => 3,
        _ => 0,
    }
}

pub fn classify(
    note: &Notification,
    mode: SubDetectMode,
    bridge_login: &str,
) -> Vec<NormalizedEvent> {
    let mut out = Vec::new();

    match note {
        Notification::Chat(msg) => {
            if let Some(bits) = msg.bits {
                if bits > 0 {
                    out.push(NormalizedEvent::Cheer { bits });
                }
            }

            // In message mode subscription signals come from a trusted
            // bridge account's announcements instead of structured
            // payloads. The modes never both apply to one notification.
            if mode == SubDetectMode::Message && msg.chatter_login == bridge_login {
                if let Some(event) = match_bridge_announcement(&msg.text) {
                    out.push(event);
                }
            }

            if let Some(cmd) = command::parse(&msg.text) {
                out.push(NormalizedEvent::Command {
                    is_moderator: is_moderator(&msg.badges),
                    command: cmd,
                });
            }
        }

        Notification::Subscription(sub) => {
            if mode == SubDetectMode::Event {
                out.push(NormalizedEvent::Subscription {
                    tier: map_tier_code(&sub.tier_code),
                    count: sub.count,
                });
            }
        }
    }

    out
}

/// The three bridge announcement shapes. Unmatched bridge text yields
/// nothing — the account also posts ordinary chatter.
fn match_bridge_announcement(text: &str) -> Option<NormalizedEvent> {
    static GIFT: OnceLock<Regex> = OnceLock::new();
    static PRIME: OnceLock<Regex> = OnceLock::new();
    static TIER: OnceLock<Regex> = OnceLock::new();

    let gift = GIFT.get_or_init(|| {
        Regex::new(r"^(.*) just gifted (\d+) Tier (\d+) subscriptions!$").expect("gift pattern")
    });
    let prime = PRIME.get_or_init(|| {
        Regex::new(r"^(.*) just subscribed with Twitch Prime!$").expect("prime pattern")
    });
    let tier = TIER.get_or_init(|| {
        Regex::new(r"^(.*) just subscribed with Tier (\d+)!$").expect("tier pattern")
    });

    if let Some(caps) = gift.captures(text) {
        let count: u32 = caps[2].parse().ok()?;
        let tier: u32 = caps[3].parse().ok()?;
        return Some(NormalizedEvent::Subscription { tier, count });
    }
    if prime.is_match(text) {
        return Some(NormalizedEvent::Subscription { tier: 1, count: 1 });
    }
    if let Some(caps) = tier.captures(text) {
        let tier: u32 = caps[2].parse().ok()?;
        return Some(NormalizedEvent::Subscription { tier, count: 1 });
    }
    None
}
