//! Meter state with deterministic hashing for audit logs.

use serde::{Deserialize, Serialize};

/// How subscription signals are detected.
///
/// `Event` trusts structured EventSub payloads; `Message` parses the chat
/// text of a third-party bridge account instead. Exactly one mode is active
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubDetectMode {
    Event,
    Message,
}

impl SubDetectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubDetectMode::Event => "event",
            SubDetectMode::Message => "message",
        }
    }
}

/// Complete meter state — the single persisted record for the channel.
///
/// Per-field serde defaults make hydration a merge: a stored record missing
/// a field gets that field's compiled-in default, never a wholesale reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterState {
    /// Current accrued amount. May exceed `max`; only the render
    /// projection clamps.
    #[serde(default = "default_value")]
    pub value: f64,

    /// Current ceiling. Invariant: strictly positive.
    #[serde(default = "default_max")]
    pub max: f64,

    /// Accrual per bit.
    #[serde(default = "default_bits_rate")]
    pub bits_rate: f64,

    /// Accrual per sub at each tier.
    #[serde(default = "default_sub_tier1_rate")]
    pub sub_tier1_rate: f64,
    #[serde(default = "default_sub_tier2_rate")]
    pub sub_tier2_rate: f64,
    #[serde(default = "default_sub_tier3_rate")]
    pub sub_tier3_rate: f64,

    /// Whether state-change confirmations are echoed to chat.
    #[serde(default)]
    pub optional_messages: bool,

    #[serde(default = "default_sub_detect")]
    pub sub_detect: SubDetectMode,
}

// Defaults assume 100 bits cost $1.40 with an 80% streamer cut, and subs
// at $5/$10/$25 with a 70% cut.
fn default_value() -> f64 {
    50.0
}
fn default_max() -> f64 {
    300.0
}
fn default_bits_rate() -> f64 {
    0.0112
}
fn default_sub_tier1_rate() -> f64 {
    3.5
}
fn default_sub_tier2_rate() -> f64 {
    7.0
}
fn default_sub_tier3_rate() -> f64 {
    17.5
}
fn default_sub_detect() -> SubDetectMode {
    SubDetectMode::Event
}

impl Default for MeterState {
    fn default() -> Self {
        Self {
            value: default_value(),
            max: default_max(),
            bits_rate: default_bits_rate(),
            sub_tier1_rate: default_sub_tier1_rate(),
            sub_tier2_rate: default_sub_tier2_rate(),
            sub_tier3_rate: default_sub_tier3_rate(),
            optional_messages: false,
            sub_detect: default_sub_detect(),
        }
    }
}

impl MeterState {
    /// Rate for a non-zero tier. Tiers above 2 share the tier-3 rate;
    /// that fallback is intentional.
    pub fn rate_for_tier(&self, tier: u32) -> f64 {
        match tier {
            1 => self.sub_tier1_rate,
            2 => self.sub_tier2_rate,
            _ => self.sub_tier3_rate,
        }
    }

    /// Deterministic state hash for audit log correlation.
    pub fn hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();

        // Quantized to avoid float comparison issues
        ((self.value * 1e8) as i64).hash(&mut h);
        ((self.max * 1e8) as i64).hash(&mut h);
        ((self.bits_rate * 1e8) as i64).hash(&mut h);
        ((self.sub_tier1_rate * 1e8) as i64).hash(&mut h);
        ((self.sub_tier2_rate * 1e8) as i64).hash(&mut h);
        ((self.sub_tier3_rate * 1e8) as i64).hash(&mut h);
        self.optional_messages.hash(&mut h);
        self.sub_detect.as_str().hash(&mut h);

        h.finish()
    }
}
