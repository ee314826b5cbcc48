//! Hit/dodge resolution.

use crate::config::CombatConfig;
use crate::env::RngOracle;
use crate::state::CombatantState;
use crate::status::StatusKind;

/// Effective hit rate for an attack, as a percentage already clamped into
/// its legal window.
///
/// Base rate is the attacker's accuracy, +60 for a player striking a
/// non-player. Target dodge is halved unless the target is a monster. A
/// ranged attacker striking a shield user fights at half rate against the
/// lowered floor.
pub fn hit_chance(attacker: &CombatantState, target: &CombatantState) -> u32 {
    let mut accuracy = attacker.stats.accuracy;
    if attacker.kind.is_player() && !target.kind.is_player() {
        accuracy += CombatConfig::PVE_ACCURACY_BONUS;
    }
    if let Some(boost) = attacker.statuses.power_of(StatusKind::AccuracyBoost) {
        accuracy = boost.apply(accuracy);
    }

    let mut dodge = target.stats.dodge;
    if !target.kind.is_monster() {
        dodge /= 2;
    }
    if let Some(boost) = target.statuses.power_of(StatusKind::DodgeBoost) {
        dodge = boost.apply(dodge);
    }

    let mut rate = accuracy.saturating_sub(dodge);
    let floor = if attacker.is_ranged() && target.is_shield_user() {
        rate /= 2;
        CombatConfig::HIT_RATE_FLOOR_VS_SHIELD
    } else {
        CombatConfig::HIT_RATE_FLOOR
    };

    rate.clamp(floor, CombatConfig::HIT_RATE_CEILING)
}

/// Rolls the dodge check. A fatal-strike attacker always hits monsters.
pub fn check_hit(
    attacker: &CombatantState,
    target: &CombatantState,
    rng: &dyn RngOracle,
    seed: u64,
) -> bool {
    if attacker.statuses.has(StatusKind::FatalStrike) && target.kind.is_monster() {
        return true;
    }
    rng.rate(seed, hit_chance(attacker, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::FixedRng;
    use crate::magnitude::Magnitude;
    use crate::state::{CapabilityFlags, EntityId, RoleKind, TimePoint};

    fn combatant(kind: RoleKind, accuracy: u32, dodge: u32) -> CombatantState {
        let mut c = CombatantState {
            id: EntityId(1),
            kind,
            alive: true,
            ..Default::default()
        };
        c.stats.accuracy = accuracy;
        c.stats.dodge = dodge;
        c
    }

    #[test]
    fn rate_clamped_for_extreme_inputs() {
        let sniper = combatant(RoleKind::Player, 100_000, 0);
        let ghost = combatant(RoleKind::Player, 0, 100_000);
        assert_eq!(hit_chance(&sniper, &ghost), 99);
        assert_eq!(hit_chance(&ghost, &sniper), CombatConfig::HIT_RATE_FLOOR);
    }

    #[test]
    fn bow_vs_shield_uses_lower_floor() {
        let mut archer = combatant(RoleKind::Player, 0, 0);
        archer.caps |= CapabilityFlags::RANGED;
        let mut knight = combatant(RoleKind::Player, 0, 100_000);
        knight.caps |= CapabilityFlags::SHIELD;
        assert_eq!(
            hit_chance(&archer, &knight),
            CombatConfig::HIT_RATE_FLOOR_VS_SHIELD
        );
    }

    #[test]
    fn pve_bonus_applies_only_to_players() {
        let player = combatant(RoleKind::Player, 50, 0);
        let monster = combatant(RoleKind::Monster, 50, 0);
        // 50 + 60 vs no dodge.
        assert_eq!(hit_chance(&player, &monster), 99);
        // Monster gets no bonus; player dodge is halved.
        assert_eq!(hit_chance(&monster, &player), 50);
    }

    #[test]
    fn monster_dodge_is_not_halved() {
        let player = combatant(RoleKind::Player, 100, 0);
        let monster = combatant(RoleKind::Monster, 0, 80);
        // 100 + 60 - 80 = 80.
        assert_eq!(hit_chance(&player, &monster), 80);
    }

    #[test]
    fn fatal_strike_always_hits_monsters() {
        let mut player = combatant(RoleKind::Player, 0, 0);
        player.statuses.apply(
            TimePoint::ZERO,
            EntityId::NONE,
            StatusKind::FatalStrike,
            Magnitude::Flat(0),
            10,
            0,
            1,
            0,
        );
        let monster = combatant(RoleKind::Monster, 0, 100_000);
        // FixedRng(99) fails every rate draw, yet the hit lands.
        assert!(check_hit(&player, &monster, &FixedRng(99), 1));

        let other = combatant(RoleKind::Player, 0, 100_000);
        assert!(!check_hit(&player, &other, &FixedRng(99), 1));
    }
}
