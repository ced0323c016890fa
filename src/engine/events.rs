//! Normalized events in, effects out.

use crate::command::MeterCommand;

/// One classified inbound event. Ephemeral — never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedEvent {
    /// A parsed chat command plus the actor's authorization.
    Command {
        is_moderator: bool,
        command: MeterCommand,
    },
    /// A bit cheer. Applies regardless of who cheered.
    Cheer { bits: u64 },
    /// A subscription signal. `tier` 0 marks an unrecognized tier code
    /// and is ignored by the reducer.
    Subscription { tier: u32, count: u32 },
}

/// Side effects requested by the reducer, drained by the event loop.
/// The reducer itself never touches a socket, the database, or the DOM
/// collaborator — it only describes what should happen.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Post a chat message, fire-and-forget.
    Say(String),
    /// Snapshot the state to the store.
    Persist,
    /// Re-project the meter for the overlay.
    Render,
    /// Re-hydrate state from the store (`!hm reload`).
    Reload,
}
