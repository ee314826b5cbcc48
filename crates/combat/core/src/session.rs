//! Melee engagement session: target bookkeeping and the attack cadence gate.
//!
//! The session itself is dumb state; target validation and the attack flow
//! run in the engine, where the whole map is reachable.

use crate::env::{EventHook, MapOracle};
use crate::state::{CombatantState, EntityId, TimePoint};
use crate::status::StatusKind;

/// One entity's melee engagement: current target and cooldown deadline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttackSession {
    /// Current target; [`EntityId::NONE`] means disengaged.
    pub target: EntityId,
    /// Next moment a swing is allowed.
    pub next_attack_at: TimePoint,
}

impl AttackSession {
    /// Records a target without validating it; validation happens on each
    /// swing because the target can die or leave at any time.
    pub fn begin_target(&mut self, target: EntityId) {
        self.target = target;
    }

    pub fn clear(&mut self) {
        self.target = EntityId::NONE;
    }

    pub fn is_engaged(&self) -> bool {
        self.target.is_some()
    }

    /// Monotonic cooldown gate: true at most once per `interval_ms` since
    /// the last true result.
    pub fn next_attack(&mut self, now: TimePoint, interval_ms: u32) -> bool {
        if !self.next_attack_at.elapsed(now) {
            return false;
        }
        self.next_attack_at = now.plus_ms(interval_ms as u64);
        true
    }
}

/// Whether `attacker` may engage `target` in melee right now.
///
/// Checks, in order: generic attackability, same map, reach (extended to
/// full view range under fatal strike), PK rules between players, flight
/// rules, and the event-system veto.
pub fn is_engageable(
    attacker: &CombatantState,
    target: &CombatantState,
    map: &dyn MapOracle,
    events: &dyn EventHook,
) -> bool {
    if !target.is_attackable() || attacker.map != target.map {
        return false;
    }

    let reach = if attacker.statuses.has(StatusKind::FatalStrike) {
        map.view_range(attacker.map)
    } else {
        attacker.stats.attack_range
    };
    if attacker.distance_to(target) > reach {
        return false;
    }

    if attacker.kind.is_player() && target.kind.is_player() {
        if map.pk_disabled(attacker.map) {
            return false;
        }
        if map.pk_protected(target.map, target.position) {
            return false;
        }
    }

    if target.is_flying() && !attacker.is_flying() && !attacker.is_ranged() {
        return false;
    }

    events.allows_attack(attacker.id, target.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{NullEvents, OpenFieldMap};
    use crate::magnitude::Magnitude;
    use crate::state::{CapabilityFlags, MapId, Position, RoleKind};

    fn fighter(id: u32, kind: RoleKind, x: u16, y: u16) -> CombatantState {
        let mut c = CombatantState {
            id: EntityId(id),
            kind,
            map: MapId(1),
            position: Position::new(x, y),
            alive: true,
            ..Default::default()
        };
        c.stats.attack_range = 2;
        c
    }

    #[test]
    fn cadence_gate_fires_once_per_interval() {
        let mut session = AttackSession::default();
        assert!(session.next_attack(TimePoint(0), 1_000));
        assert!(!session.next_attack(TimePoint(500), 1_000));
        assert!(!session.next_attack(TimePoint(999), 1_000));
        assert!(session.next_attack(TimePoint(1_000), 1_000));
        assert!(!session.next_attack(TimePoint(1_500), 1_000));
    }

    #[test]
    fn out_of_reach_is_not_engageable() {
        let map = OpenFieldMap::new();
        let attacker = fighter(1, RoleKind::Player, 10, 10);
        let near = fighter(2, RoleKind::Monster, 12, 10);
        let far = fighter(3, RoleKind::Monster, 15, 10);
        assert!(is_engageable(&attacker, &near, &map, &NullEvents));
        assert!(!is_engageable(&attacker, &far, &map, &NullEvents));
    }

    #[test]
    fn fatal_strike_extends_reach_to_view_range() {
        let map = OpenFieldMap::new();
        let mut attacker = fighter(1, RoleKind::Player, 10, 10);
        attacker.statuses.apply(
            TimePoint::ZERO,
            EntityId::NONE,
            StatusKind::FatalStrike,
            Magnitude::Flat(0),
            30,
            0,
            1,
            0,
        );
        let far = fighter(3, RoleKind::Monster, 25, 10);
        assert!(is_engageable(&attacker, &far, &map, &NullEvents));
    }

    #[test]
    fn flying_target_needs_flying_or_ranged_attacker() {
        let map = OpenFieldMap::new();
        let grounded = fighter(1, RoleKind::Player, 10, 10);
        let mut bird = fighter(2, RoleKind::Monster, 11, 10);
        bird.caps |= CapabilityFlags::FLYING;
        assert!(!is_engageable(&grounded, &bird, &map, &NullEvents));

        let mut archer = fighter(3, RoleKind::Player, 10, 10);
        archer.caps |= CapabilityFlags::RANGED;
        assert!(is_engageable(&archer, &bird, &map, &NullEvents));
    }

    #[test]
    fn dead_or_scenery_targets_are_rejected() {
        let map = OpenFieldMap::new();
        let attacker = fighter(1, RoleKind::Player, 10, 10);
        let mut corpse = fighter(2, RoleKind::Monster, 11, 10);
        corpse.alive = false;
        let scenery = fighter(3, RoleKind::StaticNpc, 11, 10);
        assert!(!is_engageable(&attacker, &corpse, &map, &NullEvents));
        assert!(!is_engageable(&attacker, &scenery, &map, &NullEvents));
    }
}
