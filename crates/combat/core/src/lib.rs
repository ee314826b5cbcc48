//! Deterministic combat-resolution and status-effect rules.
//!
//! This crate is the pure core of the combat server: damage formulas, the
//! melee attack session, the spell cast state machine, and per-entity timed
//! status effects. It performs no I/O, never reads the wall clock, and
//! draws all randomness through seeded oracles, so a whole partition tick
//! replays bit-for-bit from its inputs.
//!
//! The runtime crate binds each map to one serializing execution lane and
//! calls [`engine::CombatEngine::tick`] there; outcomes leave through the
//! [`events::Outbox`].

pub mod combat;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod magnitude;
pub mod session;
pub mod spell;
pub mod state;
pub mod status;

pub use config::CombatConfig;
pub use engine::CombatEngine;
pub use error::CastError;
pub use events::{Outbox, OutboundEvent, PersistCommand};
pub use magnitude::Magnitude;
pub use state::{CombatantState, EntityId, MapId, MapState, Position, TimePoint};
