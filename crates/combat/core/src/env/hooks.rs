//! Outward hook seams: scripting engine and minigame/event system.
//!
//! Both are external collaborators. The combat core calls through these
//! traits and never depends on their internals; the defaults are no-ops so
//! tests and tools can run the engine bare.

use crate::state::EntityId;

/// Entry point into the NPC/quest scripting engine.
///
/// Invoked by the kill flow on monster/NPC death for scripted rewards.
pub trait ScriptHook: Send + Sync {
    /// Executes a scripted action chain. Returns whether the chain ran to
    /// completion; the combat core ignores the result beyond logging.
    fn execute_action(&self, action_id: u32, actor: EntityId, target: EntityId) -> bool;
}

/// Minigame/event-system hooks around the attack pipeline.
pub trait EventHook: Send + Sync {
    /// Veto: an active event may forbid this pair from fighting.
    fn allows_attack(&self, _attacker: EntityId, _target: EntityId) -> bool {
        true
    }

    /// Called after validation, before the dodge roll.
    fn before_attack(&self, _attacker: EntityId, _target: EntityId) {}

    /// Called after damage lands.
    fn on_hit(&self, _attacker: EntityId, _target: EntityId, _damage: u32) {}

    /// Auto-skill override: a proc skill may replace the plain swing.
    /// Returning `true` short-circuits the melee attack.
    fn auto_skill(&self, _attacker: EntityId, _target: EntityId) -> bool {
        false
    }
}

/// No-op scripting engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullScript;

impl ScriptHook for NullScript {
    fn execute_action(&self, _action_id: u32, _actor: EntityId, _target: EntityId) -> bool {
        true
    }
}

/// No-op event system.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEvents;

impl EventHook for NullEvents {}
