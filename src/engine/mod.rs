//! Core event-driven engine.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  EventSub WS │────►│  Classifier  │────►│   Reducer    │
//! │  (transport) │     │ (normalize)  │     │  (pure fn)   │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Effects    │◄────│  MeterState  │
//!                      │ (say/persist)│     │  (hashed)    │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The reducer is the only place state changes. It is synchronous, total
//! and infallible; everything with a failure mode (chat sends, sqlite,
//! the render file) lives behind the effects it returns.

pub mod events;
pub mod reducer;
pub mod state;

pub use events::{Effect, NormalizedEvent};
pub use reducer::{reduce, ReducerOutput};
pub use state::{MeterState, SubDetectMode};
