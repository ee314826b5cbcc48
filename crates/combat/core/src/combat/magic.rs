//! Magic damage pipeline.

use crate::combat::DamageResult;
use crate::combat::physical::{cross_kind_scale, target_reductions};
use crate::config::CombatConfig;
use crate::magnitude::Magnitude;
use crate::state::CombatantState;

/// Computes magic damage from `attacker` to `target`.
///
/// Unlike the physical path there is no roll: magic attack is a fixed stat,
/// so the only variance comes through the spell's `power` adjustment. The
/// target's percent resist applies after defense and is capped so a spell
/// always does at least a tenth of its post-defense damage.
pub fn magic_damage(
    attacker: &CombatantState,
    target: &CombatantState,
    power: Magnitude,
) -> DamageResult {
    let mut attack = power.apply_percent_only(attacker.stats.magic_attack);

    let defense = target.stats.magic_defense;
    attack = attack.saturating_sub(defense).max(1);

    let resist = target
        .stats
        .magic_resist_pct
        .min(CombatConfig::MAGIC_RESIST_CAP);
    let mut damage = (attack as u64 * (100 - resist) as u64 / 100).max(1) as u32;

    damage = power.apply_flat_only(damage).max(1);
    damage = target_reductions(target, damage);
    damage = cross_kind_scale(attacker, target, damage);

    let signed =
        damage as i64 + attacker.stats.final_magic_attack as i64
            - target.stats.final_magic_defense as i64;
    DamageResult::of(signed.max(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EntityId, ResourceMeter, RoleKind};

    fn caster(kind: RoleKind, magic_attack: u32) -> CombatantState {
        let mut c = CombatantState {
            id: EntityId(1),
            kind,
            alive: true,
            resources: ResourceMeter::full(1_000, 0, 0),
            ..Default::default()
        };
        c.stats.magic_attack = magic_attack;
        c.stats.level = 50;
        c
    }

    fn dummy(magic_defense: u32, resist_pct: u32) -> CombatantState {
        let mut c = caster(RoleKind::StaticNpc, 0);
        c.stats.magic_defense = magic_defense;
        c.stats.magic_resist_pct = resist_pct;
        c
    }

    #[test]
    fn defense_then_resist() {
        let mage = caster(RoleKind::StaticNpc, 1_000);
        let target = dummy(200, 50);
        // (1000 - 200) * 50% = 400.
        assert_eq!(magic_damage(&mage, &target, Magnitude::NONE).damage, 400);
    }

    #[test]
    fn resist_is_capped_at_ninety() {
        let mage = caster(RoleKind::StaticNpc, 1_000);
        let immune = dummy(0, 100_000);
        // Cap at 90%: a tenth of the attack still lands.
        assert_eq!(magic_damage(&mage, &immune, Magnitude::NONE).damage, 100);
    }

    #[test]
    fn percent_power_scales_attack_before_defense() {
        let mage = caster(RoleKind::StaticNpc, 100);
        let target = dummy(150, 0);
        // 100 * 200% = 200, minus 150 defense.
        assert_eq!(
            magic_damage(&mage, &target, Magnitude::Percent(200)).damage,
            50
        );
        // Flat power lands after defense: max(1, 100 - 150) + 40.
        assert_eq!(
            magic_damage(&mage, &target, Magnitude::Flat(40)).damage,
            41
        );
    }

    #[test]
    fn floors_at_one() {
        let weak = caster(RoleKind::StaticNpc, 1);
        let wall = dummy(1_000_000, 90);
        assert_eq!(magic_damage(&weak, &wall, Magnitude::NONE).damage, 1);
    }
}
