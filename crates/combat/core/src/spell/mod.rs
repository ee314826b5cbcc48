//! Spell cast state machine data.
//!
//! The phases are Idle → Intoning → Delayed → Idle, with Abort reachable
//! from anywhere. All waiting is a stored deadline; the engine's tick pass
//! drives the transitions. Payload dispatch lives in the engine, where the
//! map and the outbox are reachable.

mod targeting;

pub use targeting::{fan_targets, line_cells, line_targets};

use crate::state::{EntityId, Position, TimePoint};

/// Where a cast currently is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastPhase {
    #[default]
    Idle,
    /// Wind-up; the payload fires when the intone deadline passes.
    Intoning,
    /// Post-launch window; auto-repeat re-fires when the delay passes.
    Delayed,
}

/// One entity's active spell cast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellCast {
    pub phase: CastPhase,
    pub spell_id: u16,
    pub level: u8,
    /// Resolved target; NONE for pure ground casts.
    pub target: EntityId,
    /// Resolved target/ground cell at begin time.
    pub ground: Position,
    pub intone_until: TimePoint,
    pub delay_until: TimePoint,
    /// Channeled fire: re-begin against the stored target after the delay.
    pub auto_repeat: bool,
    /// Per-spell-id cooldown gate (the engine keys it to the last cast).
    pub cooldown_until: TimePoint,
}

impl SpellCast {
    pub fn is_idle(&self) -> bool {
        self.phase == CastPhase::Idle
    }

    /// Cooldown gate for a fresh cast of `spell_id`.
    pub fn ready(&self, now: TimePoint, spell_id: u16) -> bool {
        spell_id != self.spell_id || self.cooldown_until.elapsed(now)
    }

    /// Enters Intoning with the given wind-up deadline.
    pub fn intone(
        &mut self,
        now: TimePoint,
        spell_id: u16,
        level: u8,
        target: EntityId,
        ground: Position,
        intone_ms: u32,
    ) {
        self.phase = CastPhase::Intoning;
        self.spell_id = spell_id;
        self.level = level;
        self.target = target;
        self.ground = ground;
        self.intone_until = now.plus_ms(intone_ms as u64);
    }

    /// Enters the post-launch Delayed window.
    pub fn enter_delay(&mut self, now: TimePoint, delay_ms: u32, auto_repeat: bool) {
        self.phase = CastPhase::Delayed;
        self.delay_until = now.plus_ms(delay_ms as u64);
        self.auto_repeat = auto_repeat;
    }

    /// Starts the cooldown window after a launch (successful or fizzled).
    pub fn start_cooldown(&mut self, now: TimePoint, cooldown_ms: u64) {
        self.cooldown_until = now.plus_ms(cooldown_ms);
    }

    /// Synchronous transition to Idle. Returns whether anything was
    /// actually cancelled; on an already-Idle cast this is a no-op and the
    /// caller sends no notice.
    pub fn abort(&mut self) -> bool {
        if self.phase == CastPhase::Idle && !self.auto_repeat {
            return false;
        }
        self.phase = CastPhase::Idle;
        self.auto_repeat = false;
        self.intone_until = TimePoint::ZERO;
        self.delay_until = TimePoint::ZERO;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_on_idle_is_a_no_op() {
        let mut cast = SpellCast::default();
        let before = cast;
        assert!(!cast.abort());
        assert_eq!(cast, before);
    }

    #[test]
    fn abort_cancels_intoning_and_auto_repeat() {
        let mut cast = SpellCast::default();
        cast.intone(TimePoint(100), 1000, 3, EntityId(5), Position::new(1, 1), 900);
        assert_eq!(cast.phase, CastPhase::Intoning);
        assert!(cast.abort());
        assert_eq!(cast.phase, CastPhase::Idle);

        cast.enter_delay(TimePoint(100), 500, true);
        assert!(cast.abort());
        assert!(!cast.auto_repeat);
    }

    #[test]
    fn cooldown_gate_is_per_spell() {
        let mut cast = SpellCast::default();
        cast.spell_id = 1000;
        cast.start_cooldown(TimePoint(0), 2_000);
        assert!(!cast.ready(TimePoint(1_000), 1000));
        assert!(cast.ready(TimePoint(2_000), 1000));
        // A different spell id is not gated by this cooldown.
        assert!(cast.ready(TimePoint(1_000), 1001));
    }
}
