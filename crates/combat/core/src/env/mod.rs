//! Traits describing the read-only world the engine runs against.
//!
//! Oracles expose map geometry and region predicates, spell definitions,
//! deterministic randomness, and the outward hook seams. The [`CombatEnv`]
//! aggregate bundles them so the engine can reach everything it needs
//! without hard coupling to concrete implementations.

mod hooks;
mod map;
mod rng;
mod spells;

pub use hooks::{EventHook, NullEvents, NullScript, ScriptHook};
pub use map::{MapOracle, OpenFieldMap};
pub use rng::{FixedRng, PcgRng, RngOracle, compute_seed};
pub use spells::{SpellCategory, SpellDefinition, SpellKind, SpellOracle, StatusRider};

/// Bundle of every oracle the engine consumes.
///
/// All references are mandatory: unlike optional subsystems, a combat
/// partition cannot run without geometry, spell data, or randomness.
#[derive(Clone, Copy)]
pub struct CombatEnv<'a> {
    pub map: &'a dyn MapOracle,
    pub spells: &'a dyn SpellOracle,
    pub rng: &'a dyn RngOracle,
    pub script: &'a dyn ScriptHook,
    pub events: &'a dyn EventHook,
}

impl<'a> CombatEnv<'a> {
    pub fn new(
        map: &'a dyn MapOracle,
        spells: &'a dyn SpellOracle,
        rng: &'a dyn RngOracle,
        script: &'a dyn ScriptHook,
        events: &'a dyn EventHook,
    ) -> Self {
        Self {
            map,
            spells,
            rng,
            script,
            events,
        }
    }
}
