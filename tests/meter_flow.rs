//! End-to-end validation of the classify → reduce → effects pipeline.
//!
//! These tests drive the same path the event loop does — raw notification
//! in, effects drained against a real sqlite store — without the network
//! collaborators. They are the gate between "units pass" and "the widget
//! behaves".

use hypemeter::classify::classify;
use hypemeter::engine::{reduce, Effect, MeterState, SubDetectMode};
use hypemeter::feed::notification::{ChatMessage, Notification, SubNotice};
use hypemeter::render::project;
use hypemeter::storage::StateStore;

const BRIDGE: &str = "streamlabs";

/// Minimal stand-in for the event loop: classifies, reduces, and drains
/// effects against the store, recording outbound messages.
struct Harness {
    state: MeterState,
    store: StateStore,
    said: Vec<String>,
}

impl Harness {
    fn new(mut store: StateStore) -> Self {
        store.init().unwrap();
        let state = store.load().unwrap().unwrap_or_default();
        Self {
            state,
            store,
            said: Vec::new(),
        }
    }

    fn in_memory() -> Self {
        Self::new(StateStore::open_in_memory().unwrap())
    }

    fn push(&mut self, note: Notification) {
        for event in classify(&note, self.state.sub_detect, BRIDGE) {
            let out = reduce(&mut self.state, event);
            for effect in out.effects {
                match effect {
                    Effect::Say(message) => self.said.push(message),
                    Effect::Persist => self.store.save(&self.state).unwrap(),
                    Effect::Render => {}
                    Effect::Reload => {
                        self.state = self.store.load().unwrap().unwrap_or_default();
                    }
                }
            }
        }
    }

    fn chat(&mut self, login: &str, badges: &[&str], text: &str) {
        self.cheer_chat(login, badges, text, None);
    }

    fn cheer_chat(&mut self, login: &str, badges: &[&str], text: &str, bits: Option<u64>) {
        self.push(Notification::Chat(ChatMessage {
            chatter_login: login.to_string(),
            badges: badges.iter().map(|b| b.to_string()).collect(),
            text: text.to_string(),
            bits,
        }));
    }
}

// ---------------------------------------------------------------------------
// S01: The documented walkthrough — set, cheer, query
// ---------------------------------------------------------------------------
#[test]
fn s01_set_cheer_get_scenario() {
    let mut h = Harness::in_memory();
    assert_eq!(h.state.value, 50.0);

    h.chat("mod", &["moderator"], "!hm set 100 300");
    assert_eq!(h.state.value, 100.0);

    h.cheer_chat("fan", &[], "cheer1000 lets go", Some(1000));
    assert!((h.state.value - 111.2).abs() < 1e-9);

    h.chat("mod", &["moderator"], "!hm get");
    assert_eq!(h.said, vec!["Hype meter is at 111.20 / 300.00"]);
}

// ---------------------------------------------------------------------------
// S02: Rate change then a tier-2 gift of three subs adds 27
// ---------------------------------------------------------------------------
#[test]
fn s02_subrate2_then_tier2_gift() {
    let mut h = Harness::in_memory();
    h.chat("mod", &["broadcaster"], "!hm subrate2 9");
    assert_eq!(h.state.sub_tier2_rate, 9.0);

    h.push(Notification::Subscription(SubNotice {
        tier_code: "2000".to_string(),
        count: 3,
    }));
    assert!((h.state.value - 77.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// S03: Unauthorized mutation is invisible — no state change, no reply
// ---------------------------------------------------------------------------
#[test]
fn s03_unauthorized_reset_is_invisible() {
    let mut h = Harness::in_memory();
    h.chat("mod", &["moderator"], "!hm set 200");
    let before = h.state.clone();

    h.chat("viewer", &["subscriber"], "!hm reset");
    h.chat("viewer", &[], "!hm set 0");
    h.chat("viewer", &[], "!hm get");

    assert_eq!(h.state, before);
    assert!(h.said.is_empty());
}

// ---------------------------------------------------------------------------
// S04: State survives a restart byte-for-byte
// ---------------------------------------------------------------------------
#[test]
fn s04_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meter.sqlite");
    let path = path.to_str().unwrap();

    let mut h = Harness::new(StateStore::open(path).unwrap());
    h.chat("mod", &["moderator"], "!hm set 123.45 500");
    h.chat("mod", &["moderator"], "!hm bitsrate 0.02");
    h.chat("mod", &["moderator"], "!hm messages enable");
    let before = h.state.clone();
    drop(h);

    let h2 = Harness::new(StateStore::open(path).unwrap());
    assert_eq!(h2.state, before);
}

// ---------------------------------------------------------------------------
// S05: A record from an older build hydrates field-by-field
// ---------------------------------------------------------------------------
#[test]
fn s05_partial_record_merges_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meter.sqlite");
    let path = path.to_str().unwrap();

    let mut store = StateStore::open(path).unwrap();
    store.init().unwrap();
    drop(store);

    // Simulate a record written before the detection mode existed.
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "INSERT INTO meter_state (key, body, updated_at) VALUES ('hypemeter', ?1, 0)",
        [r#"{"value": 42.0, "max": 100.0}"#],
    )
    .unwrap();
    drop(conn);

    let h = Harness::new(StateStore::open(path).unwrap());
    assert_eq!(h.state.value, 42.0);
    assert_eq!(h.state.max, 100.0);
    assert_eq!(h.state.bits_rate, 0.0112);
    assert_eq!(h.state.sub_detect, SubDetectMode::Event);
}

// ---------------------------------------------------------------------------
// S06: `!hm reload` picks up out-of-band store edits
// ---------------------------------------------------------------------------
#[test]
fn s06_reload_rehydrates_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meter.sqlite");
    let path = path.to_str().unwrap();

    let mut h = Harness::new(StateStore::open(path).unwrap());
    h.chat("mod", &["moderator"], "!hm set 200");

    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "UPDATE meter_state SET body = ?1 WHERE key = 'hypemeter'",
        [r#"{"value": 77.0}"#],
    )
    .unwrap();
    drop(conn);

    h.chat("mod", &["moderator"], "!hm reload");
    assert_eq!(h.state.value, 77.0);
}

// ---------------------------------------------------------------------------
// S07: Overflow lives in storage, clamping only in the projection
// ---------------------------------------------------------------------------
#[test]
fn s07_overflow_clamps_only_in_projection() {
    let mut h = Harness::in_memory();
    h.chat("mod", &["moderator"], "!hm set 290 300");
    h.cheer_chat("whale", &[], "cheer5000", Some(5000));

    assert!((h.state.value - 346.0).abs() < 1e-9);
    let frame = project(&h.state);
    assert_eq!(frame.percent, 100.0);
    assert_eq!(frame.label, "100%");

    // `complete` wraps the stored overflow back below the ceiling.
    h.chat("mod", &["moderator"], "!hm complete");
    assert!((h.state.value - 46.0).abs() < 1e-9);
    assert!(project(&h.state).percent < 100.0);
}

// ---------------------------------------------------------------------------
// S08: Message-mode detection end to end, including the mode switch
// ---------------------------------------------------------------------------
#[test]
fn s08_message_mode_bridge_announcements() {
    let mut h = Harness::in_memory();
    h.chat("mod", &["moderator"], "!hm subdetect message");
    assert_eq!(h.state.sub_detect, SubDetectMode::Message);

    // Structured payloads are now ignored...
    h.push(Notification::Subscription(SubNotice {
        tier_code: "3000".to_string(),
        count: 1,
    }));
    assert_eq!(h.state.value, 50.0);

    // ...and the bridge announcements accrue instead.
    h.chat(BRIDGE, &[], "SomeFan just gifted 2 Tier 1 subscriptions!");
    assert_eq!(h.state.value, 57.0);
    h.chat(BRIDGE, &[], "SomeFan just subscribed with Twitch Prime!");
    assert_eq!(h.state.value, 60.5);

    // Impersonation from a non-bridge account does nothing.
    h.chat("prankster", &[], "X just gifted 99 Tier 3 subscriptions!");
    assert_eq!(h.state.value, 60.5);
}

// ---------------------------------------------------------------------------
// S09: Malformed input never mutates, never replies, never panics
// ---------------------------------------------------------------------------
#[test]
fn s09_malformed_commands_do_nothing() {
    let mut h = Harness::in_memory();
    let before = h.state.clone();

    for text in [
        "!hm",
        "!hm frobnicate",
        "!hm set",
        "!hm set minus-five",
        "!hm set -5",
        "!hm set 10 0",
        "!hm add NaN",
        "!hm bitsrate 0",
        "!hm subrate1 -2",
        "!hm simsubs many",
        "!hm complete -1",
        "!sethypemeter",
        "!sethm abc",
    ] {
        h.chat("mod", &["moderator"], text);
    }

    assert_eq!(h.state, before);
    assert!(h.said.is_empty());
}

// ---------------------------------------------------------------------------
// S10: A cheer riding on a command message applies both
// ---------------------------------------------------------------------------
#[test]
fn s10_cheer_and_command_on_one_message() {
    let mut h = Harness::in_memory();
    h.cheer_chat("mod", &["moderator"], "!hm get", Some(100));
    assert!((h.state.value - 51.12).abs() < 1e-9);
    // The reply reflects the already-applied cheer.
    assert_eq!(h.said, vec!["Hype meter is at 51.12 / 300.00"]);
}
