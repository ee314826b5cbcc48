//! Spell definitions and the oracle that resolves them.
//!
//! Definitions are immutable data loaded by the content crate; the FSM and
//! payload dispatch read them through [`SpellOracle`].

use crate::magnitude::Magnitude;
use crate::status::StatusKind;

/// Payload discriminator. `Launch` dispatches on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellKind {
    /// Single-target damage.
    Single,
    /// Party/self heal.
    Recruit,
    /// Fan-shaped area from the caster through the target point.
    Fan,
    /// All entities within a radius of the resolved center.
    Bomb,
    /// Attach a timed status to one target.
    AttachStatus,
    /// Remove a status from one target.
    DetachStatus,
    /// Zero-damage party buff that shares experience.
    DispatchXp,
    /// Straight rasterized path of cells toward the target point.
    Line,
    /// Single-target damage plus a status rider.
    AttackStatus,
    /// Transform the caster.
    Transform,
    /// Restore mana to self or one target.
    RestoreMana,
    /// Summon a pet/NPC.
    Summon,
    /// Delayed ground-area status application.
    GroundSting,
    /// First cast arms a self status; recasts pulse a bomb area while armed.
    Vortex,
    /// Switch/trap activation damage (collide). Bypasses the cast cooldown.
    Collide,
    /// Dismount one target, gated by relative mount tier.
    Dismount,
    /// Dismount every rider in an area, gated by relative mount tier.
    DismountArea,
    /// Toggle the caster's mount status.
    MountToggle,
}

impl SpellKind {
    /// Kinds whose payload touches more than one target.
    pub fn is_area(self) -> bool {
        matches!(
            self,
            SpellKind::Fan | SpellKind::Bomb | SpellKind::Line | SpellKind::DismountArea
        )
    }

    /// Kinds that can be cast at a ground point with no resolved target.
    pub fn is_ground(self) -> bool {
        matches!(
            self,
            SpellKind::Bomb | SpellKind::Line | SpellKind::Fan | SpellKind::GroundSting
        )
    }
}

/// Coarse category for per-map bans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellCategory {
    Offensive,
    Support,
    Transform,
    Mount,
}

impl SpellKind {
    pub fn category(self) -> SpellCategory {
        match self {
            SpellKind::Recruit | SpellKind::DispatchXp | SpellKind::RestoreMana => {
                SpellCategory::Support
            }
            SpellKind::Transform => SpellCategory::Transform,
            SpellKind::MountToggle => SpellCategory::Mount,
            _ => SpellCategory::Offensive,
        }
    }
}

/// Status rider carried by attach/combo/ground-sting spells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRider {
    pub kind: StatusKind,
    pub power: Magnitude,
    pub duration_secs: u32,
    pub pulses: u32,
}

/// Immutable description of one spell at one level.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellDefinition {
    pub id: u16,
    pub level: u8,
    pub kind: SpellKind,
    /// Damage/heal magnitude, already decoded from the raw encoding.
    pub power: Magnitude,
    /// Cast wind-up; zero means the payload fires immediately on begin.
    pub intone_ms: u32,
    /// Post-cast delay driving the auto-repeat window.
    pub delay_ms: u32,
    /// Base cooldown between casts; reduced per spell level.
    pub cooldown_ms: u32,
    /// Reach in cells.
    pub range: u16,
    pub mana_cost: u32,
    pub stamina_cost: u32,
    /// Consumes one unit of ammunition per cast.
    pub uses_ammo: bool,
    /// Required equipped weapon subtype, if any.
    pub weapon_subtype: Option<u16>,
    /// Proc-style skill fired by the auto-skill override; skips the
    /// proc-chance gate and the attempt notice.
    pub auto_active: bool,
    /// Percent chance gate rolled on begin, when present.
    pub chance_pct: Option<u32>,
    /// Plain weapon swing dressed as a spell; attempt notice is skipped.
    pub weapon_spell: bool,
    /// May target corpses (revive/grave payloads).
    pub target_corpse: bool,
    /// Spell re-fires against the stored target after `delay_ms`.
    pub auto_repeat: bool,
    pub rider: Option<StatusRider>,
    /// Template id for summon payloads.
    pub summon_template: Option<u16>,
}

impl SpellDefinition {
    /// Effective cooldown: each spell level shaves 10% off the base,
    /// floored at half. Collide-type spells bypass the cooldown entirely.
    pub fn effective_cooldown_ms(&self) -> u64 {
        if self.kind == SpellKind::Collide {
            return 0;
        }
        let base = self.cooldown_ms as u64;
        let reduced = base.saturating_sub(base * self.level.min(5) as u64 / 10);
        reduced.max(base / 2)
    }
}

/// Resolves spell definitions by id and level.
pub trait SpellOracle: Send + Sync {
    fn spell(&self, id: u16, level: u8) -> Option<&SpellDefinition>;

    /// Highest known level for a spell id.
    fn max_level(&self, id: u16) -> Option<u8>;
}
