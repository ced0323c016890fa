//! Pure reducer: (MeterState, NormalizedEvent) -> (MeterState', effects)
//!
//! All state transitions happen here. The reducer is total: every branch
//! through the command grammar lands somewhere, and the unmatched or
//! rejected cases are explicit no-ops. Rejections are silent — no message,
//! no mutation — so malformed or unauthorized input is indistinguishable
//! from no input at all.

use super::events::{Effect, NormalizedEvent};
use super::state::MeterState;
use crate::command::MeterCommand;

/// Result of processing one event.
#[derive(Debug)]
pub struct ReducerOutput {
    pub effects: Vec<Effect>,
    pub state_hash: u64,
}

pub fn reduce(state: &mut MeterState, event: NormalizedEvent) -> ReducerOutput {
    let mut effects = Vec::new();

    match event {
        NormalizedEvent::Cheer { bits } => {
            apply_bits(state, bits as f64, &mut effects);
        }
        NormalizedEvent::Subscription { tier, count } => {
            apply_subs(state, tier, count, &mut effects);
        }
        NormalizedEvent::Command {
            is_moderator,
            command,
        } => {
            // Mutating and read-only commands alike are moderator-gated;
            // failing the gate looks exactly like malformed input.
            if is_moderator {
                handle_command(state, command, &mut effects);
            }
        }
    }

    ReducerOutput {
        state_hash: state.hash(),
        effects,
    }
}

fn apply_bits(state: &mut MeterState, bits: f64, effects: &mut Vec<Effect>) {
    let val = state.value + state.bits_rate * bits;
    state.value = val;
    effects.push(Effect::Persist);
    effects.push(Effect::Render);
    confirm(
        state,
        effects,
        format!("Hype meter increased to {:.2} for {} bits", val, bits),
    );
}

fn apply_subs(state: &mut MeterState, tier: u32, count: u32, effects: &mut Vec<Effect>) {
    // Tier 0 is an unrecognized tier code from the classifier.
    if tier == 0 {
        return;
    }
    let val = state.value + state.rate_for_tier(tier) * count as f64;
    state.value = val;
    effects.push(Effect::Persist);
    effects.push(Effect::Render);
    confirm(
        state,
        effects,
        format!(
            "Hype meter increased to {:.2} for {} tier {} subs",
            val, count, tier
        ),
    );
}

fn handle_command(state: &mut MeterState, command: MeterCommand, effects: &mut Vec<Effect>) {
    match command {
        MeterCommand::Set { value, max } => {
            if value < 0.0 {
                return;
            }
            if let Some(m) = max {
                if m <= 0.0 {
                    return;
                }
            }
            state.value = value;
            if let Some(m) = max {
                state.max = m;
            }
            effects.push(Effect::Persist);
            effects.push(Effect::Render);
            confirm(state, effects, format!("Hype meter set to {:.2}", value));
        }

        MeterCommand::Add { delta } => {
            let val = state.value + delta;
            // Grammar already refuses non-finite input; this keeps the
            // finiteness invariant even against overflow.
            if !val.is_finite() {
                return;
            }
            state.value = val;
            effects.push(Effect::Persist);
            effects.push(Effect::Render);
            confirm(state, effects, format!("Hype meter set to {:.2}", val));
        }

        MeterCommand::Get => {
            effects.push(Effect::Say(format!(
                "Hype meter is at {:.2} / {:.2}",
                state.value, state.max
            )));
        }

        MeterCommand::Reload => {
            effects.push(Effect::Reload);
        }

        MeterCommand::BitsRate { rate } => {
            if rate <= 0.0 {
                return;
            }
            state.bits_rate = rate;
            effects.push(Effect::Persist);
            confirm(
                state,
                effects,
                format!("Hype meter bits rate set to {:.2}", rate),
            );
        }

        MeterCommand::SubRate { tier, rate } => {
            if rate <= 0.0 {
                return;
            }
            match tier {
                1 => state.sub_tier1_rate = rate,
                2 => state.sub_tier2_rate = rate,
                3 => state.sub_tier3_rate = rate,
                _ => return,
            }
            effects.push(Effect::Persist);
            confirm(
                state,
                effects,
                format!("Hype meter sub tier {} rate set to {:.2}", tier, rate),
            );
        }

        MeterCommand::Config => {
            effects.push(Effect::Say(format!(
                "Hype meter bits rate: {}, sub tier 1 rate: {}, sub tier 2 rate: {}, sub tier 3 rate: {}",
                state.bits_rate,
                state.sub_tier1_rate,
                state.sub_tier2_rate,
                state.sub_tier3_rate
            )));
        }

        MeterCommand::Reset => {
            *state = MeterState::default();
            effects.push(Effect::Persist);
            effects.push(Effect::Render);
            confirm(
                state,
                effects,
                "Hype meter reset to default values".to_string(),
            );
        }

        MeterCommand::SimBits { bits } => {
            if bits <= 0.0 {
                return;
            }
            apply_bits(state, bits, effects);
        }

        MeterCommand::SimSubs { count, tier } => {
            apply_subs(state, tier, count, effects);
        }

        MeterCommand::Messages { enabled } => {
            state.optional_messages = enabled;
            effects.push(Effect::Persist);
            // Confirmation goes through the flag that was just set, so
            // enabling announces itself and disabling is silent.
            confirm(state, effects, "Optional messages enabled".to_string());
        }

        MeterCommand::SubDetect { mode } => {
            state.sub_detect = mode;
            effects.push(Effect::Persist);
            confirm(
                state,
                effects,
                format!("Sub detection set to {}", mode.as_str()),
            );
        }

        MeterCommand::Complete { new_max } => {
            if let Some(m) = new_max {
                if m <= 0.0 {
                    return;
                }
            }
            // Wrap against the pre-update ceiling, then move the ceiling.
            state.value %= state.max;
            if let Some(m) = new_max {
                state.max = m;
            }
            effects.push(Effect::Persist);
            effects.push(Effect::Render);
        }
    }
}

/// Push a confirmation only when the channel has opted in.
fn confirm(state: &MeterState, effects: &mut Vec<Effect>, message: String) {
    if state.optional_messages {
        effects.push(Effect::Say(message));
    }
}
