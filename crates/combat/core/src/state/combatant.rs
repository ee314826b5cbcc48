//! Combatant state: the per-entity data every combat operation reads.
//!
//! The original hierarchy of player/monster/NPC classes overriding stat
//! getters collapses here into a tagged [`RoleKind`] plus plain stat fields.
//! Hot-path damage math reads fields directly; kind-specific behavior
//! branches on the tag.

use bitflags::bitflags;

use crate::session::AttackSession;
use crate::spell::SpellCast;
use crate::state::{EntityId, MapId, Position};
use crate::status::StatusRegistry;

/// Which kind of entity a combatant is.
///
/// Several balancing branches (PvE accuracy bonus, disdain table, PvP level
/// brackets, experience qualification) key off this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoleKind {
    Player,
    Monster,
    StaticNpc,
    DynamicNpc,
}

impl RoleKind {
    pub fn is_player(self) -> bool {
        self == RoleKind::Player
    }

    pub fn is_monster(self) -> bool {
        self == RoleKind::Monster
    }

    pub fn is_npc(self) -> bool {
        matches!(self, RoleKind::StaticNpc | RoleKind::DynamicNpc)
    }

    /// Whether killing this kind awards character/weapon experience.
    /// Static scenery NPCs never do.
    pub fn qualifies_for_experience(self) -> bool {
        matches!(self, RoleKind::Monster | RoleKind::DynamicNpc)
    }
}

bitflags! {
    /// Static class capabilities, as opposed to timed statuses.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CapabilityFlags: u16 {
        /// Attacks at range and bypasses melee defense.
        const RANGED = 1 << 0;
        /// Carries a shield; halves incoming ranged hit rates.
        const SHIELD = 1 << 1;
        /// Airborne; only flying or ranged attackers can engage.
        const FLYING = 1 << 2;
        /// Guard NPC; exempt from the fatal-strike teleport.
        const GUARD = 1 << 3;
    }
}

/// Profession group, indexing the PvP damage bracket tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Profession {
    #[default]
    Warrior,
    Archer,
    Mage,
}

impl Profession {
    pub(crate) fn table_index(self) -> usize {
        match self {
            Profession::Warrior => 0,
            Profession::Archer => 1,
            Profession::Mage => 2,
        }
    }
}

/// Full stat block read by the damage model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBlock {
    pub min_attack: u32,
    pub max_attack: u32,
    pub defense: u32,
    pub magic_attack: u32,
    pub magic_defense: u32,
    /// Percent magic resist; capped at 90 inside the formula.
    pub magic_resist_pct: u32,
    pub dodge: u32,
    pub accuracy: u32,
    /// Melee cooldown between attacks.
    pub attack_interval_ms: u32,
    /// Weapon reach in cells.
    pub attack_range: u16,
    /// Aggregate gear score driving the disdain table.
    pub battle_power: u16,
    pub level: u16,
    /// Reborn count; grants the level-gated defense bonus.
    pub metempsychosis: u8,
    pub profession: Profession,
    /// Flat end-of-pipeline modifiers from gear enchants.
    pub final_attack: i32,
    pub final_defense: i32,
    pub final_magic_attack: i32,
    pub final_magic_defense: i32,
    /// Percent reduction from the target's weapon-damage-reduction gear.
    pub weapon_damage_reduction_pct: u32,
}

/// Life/mana/stamina pools with saturating arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    pub life: u32,
    pub max_life: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub stamina: u32,
    pub max_stamina: u32,
}

impl ResourceMeter {
    pub fn full(max_life: u32, max_mana: u32, max_stamina: u32) -> Self {
        Self {
            life: max_life,
            max_life,
            mana: max_mana,
            max_mana,
            stamina: max_stamina,
            max_stamina,
        }
    }

    /// Applies damage. Returns `true` if life reached zero.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        self.life = self.life.saturating_sub(damage);
        self.life == 0
    }

    pub fn heal(&mut self, amount: u32) {
        self.life = (self.life + amount).min(self.max_life);
    }

    pub fn restore_mana(&mut self, amount: u32) {
        self.mana = (self.mana + amount).min(self.max_mana);
    }

    pub fn can_afford(&self, mana: u32, stamina: u32) -> bool {
        self.mana >= mana && self.stamina >= stamina
    }

    /// Deducts spell costs. Callers must have checked `can_afford` first.
    pub fn spend(&mut self, mana: u32, stamina: u32) {
        self.mana = self.mana.saturating_sub(mana);
        self.stamina = self.stamina.saturating_sub(stamina);
    }
}

/// One logical entity on a map: identity, stats, and the three owned
/// combat sub-states (statuses, attack session, spell cast).
///
/// Owned by its map partition; mutated only on that partition's lane.
#[derive(Clone, Debug, Default)]
pub struct CombatantState {
    pub id: EntityId,
    pub kind: RoleKind,
    pub map: MapId,
    pub position: Position,
    pub alive: bool,
    pub caps: CapabilityFlags,
    pub resources: ResourceMeter,
    pub stats: StatBlock,

    /// Active timed effects, keyed by kind.
    pub statuses: StatusRegistry,
    /// Melee engagement session.
    pub session: AttackSession,
    /// Active spell cast.
    pub cast: SpellCast,

    /// Remaining ammunition for ranged attacks.
    pub ammo: u32,
    /// Weapon durability; decays on each landed melee hit.
    pub durability: u16,
    /// Subtype id of the equipped weapon, checked by weapon-gated spells.
    pub weapon_subtype: u16,
    /// Mount quality; gates dismount-area payloads.
    pub mount_tier: u8,
    /// Percent chance to redirect an incoming melee attack.
    pub scapegoat_chance: u8,
    /// Scripted action chain run on this entity's death; 0 means none.
    pub death_action: u32,

    /// Accumulated character experience (drained by the owning service).
    pub experience: u64,
    /// Accumulated weapon-skill experience.
    pub weapon_skill_exp: u64,
    /// PvP notoriety counter fed by the crime tracking step.
    pub notoriety: u32,
}

impl Default for RoleKind {
    fn default() -> Self {
        RoleKind::Monster
    }
}

impl CombatantState {
    pub fn is_ranged(&self) -> bool {
        self.caps.contains(CapabilityFlags::RANGED)
    }

    pub fn is_shield_user(&self) -> bool {
        self.caps.contains(CapabilityFlags::SHIELD)
    }

    pub fn is_flying(&self) -> bool {
        self.caps.contains(CapabilityFlags::FLYING)
    }

    pub fn is_guard(&self) -> bool {
        self.caps.contains(CapabilityFlags::GUARD)
    }

    /// Generic attackability predicate: alive, and not a static scenery NPC.
    pub fn is_attackable(&self) -> bool {
        self.alive && self.kind != RoleKind::StaticNpc
    }

    pub fn distance_to(&self, other: &CombatantState) -> u16 {
        self.position.distance(other.position)
    }
}
