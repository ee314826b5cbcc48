//! Status kinds and individual effect instances.

use crate::config::CombatConfig;
use crate::magnitude::Magnitude;
use crate::state::{EntityId, Position, TimePoint};

/// Timed effect discriminator.
///
/// Discriminants are wire-stable small integers doubling as bit positions
/// in the owner's status flag word, so they must stay below 64 and never be
/// reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StatusKind {
    /// Flat/percent accuracy adjuster read by the hit formula.
    AccuracyBoost = 1,
    /// Flat/percent dodge adjuster read by the hit formula.
    DodgeBoost = 2,
    /// Defense multiplier applied in the physical pipeline.
    MagicShield = 3,
    /// Outgoing physical damage multiplier.
    Stigma = 4,
    /// Outgoing damage multiplier, stacks with stigma.
    Intensify = 5,
    /// Outgoing damage multiplier; inert against NPC and player targets.
    Superman = 6,
    /// Incoming damage percent reduction.
    Blessing = 7,
    /// Incoming damage percent reduction from the tortoise gem set.
    TortoiseGem = 8,
    /// Grants the lucky double-damage proc.
    LuckyAura = 9,
    /// Extended attack range, auto-hit vs monsters, teleport-behind swing.
    FatalStrike = 10,
    /// Pulsed poison damage.
    Poison = 11,
    /// Pulsed percent-of-current-life damage.
    LifeBurn = 12,
    /// Armed vortex; pulses re-trigger the arming spell's bomb area.
    Vortex = 13,
    /// Caster is transformed; blocks further casting.
    Transformed = 14,
    /// Riding a mount.
    Mounted = 15,
    /// Periodic stamina nudge while the caster stays close.
    Prayer = 16,
    /// Terminal corpse marker; persists until explicitly cleared.
    Ghost = 17,
    /// Terminal corpse seal; persists until explicitly cleared.
    CorpseSeal = 18,
}

impl StatusKind {
    /// Bit in the owner's status flag word.
    pub fn flag_bit(self) -> u64 {
        1u64 << (self as u8)
    }

    /// Kinds driven by a pulse counter rather than a duration.
    pub fn is_pulsed(self) -> bool {
        matches!(
            self,
            StatusKind::Poison | StatusKind::LifeBurn | StatusKind::Vortex
        )
    }

    /// Terminal corpse kinds that outlive normal pruning.
    pub fn is_protected(self) -> bool {
        matches!(self, StatusKind::Ghost | StatusKind::CorpseSeal)
    }

    /// Pulsed kinds that end when the owner dies.
    pub fn ends_on_death(self) -> bool {
        matches!(
            self,
            StatusKind::Poison | StatusKind::LifeBurn | StatusKind::Vortex
        )
    }

    /// Single kinds that run a fixed 1-second side payload while valid.
    pub fn has_sub_interval(self) -> bool {
        self == StatusKind::Prayer
    }
}

/// Duration-or-pulse bookkeeping for one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectShape {
    /// Expires when the deadline passes. `next_sub_at` drives the optional
    /// 1-second side payload, independent of expiry.
    Single {
        expires_at: TimePoint,
        next_sub_at: Option<TimePoint>,
    },
    /// Expires when the counter reaches zero; each interval crossing runs
    /// the payload and decrements.
    Pulsed {
        pulses_left: u32,
        interval_ms: u64,
        next_pulse_at: TimePoint,
    },
}

/// Read-only view of the owner handed to pulse payloads.
#[derive(Clone, Copy, Debug)]
pub struct OwnerView {
    pub id: EntityId,
    pub life: u32,
    pub max_life: u32,
    pub alive: bool,
    pub position: Position,
}

/// Side effects produced by a status tick, applied by the engine.
///
/// Damage pulses carry the attaching caster so the kill flow can credit
/// the death even when the final pulse also expires the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusPulse {
    /// Damage the owner (poison, life burn).
    Damage {
        kind: StatusKind,
        caster: EntityId,
        amount: u32,
    },
    /// Small periodic resource nudge (prayer).
    StaminaNudge { amount: i32 },
    /// Re-trigger the arming spell's area payload around the owner.
    AuraRecast { spell_id: u16, level: u8 },
}

/// One live timed effect.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusInstance {
    kind: StatusKind,
    power: Magnitude,
    caster: EntityId,
    level: u8,
    /// Spell that attached this effect; vortex recasts it.
    source_spell: u16,
    shape: EffectShape,
    cancelled: bool,
}

impl StatusInstance {
    const PRAYER_RANGE: u16 = 30;
    const PRAYER_STAMINA: i32 = 7;
    const PULSE_INTERVAL_MS: u64 = 2_000;

    pub fn new(
        now: TimePoint,
        kind: StatusKind,
        power: Magnitude,
        caster: EntityId,
        level: u8,
        source_spell: u16,
        duration_secs: u32,
        pulses: u32,
    ) -> Self {
        let shape = if kind.is_pulsed() {
            EffectShape::Pulsed {
                pulses_left: pulses.max(1),
                interval_ms: Self::PULSE_INTERVAL_MS,
                next_pulse_at: now.plus_ms(Self::PULSE_INTERVAL_MS),
            }
        } else {
            EffectShape::Single {
                expires_at: now.plus_ms(duration_secs as u64 * 1_000),
                next_sub_at: kind
                    .has_sub_interval()
                    .then(|| now.plus_ms(CombatConfig::STATUS_SUB_INTERVAL_MS)),
            }
        };
        Self {
            kind,
            power,
            caster,
            level,
            source_spell,
            shape,
            cancelled: false,
        }
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn power(&self) -> Magnitude {
        self.power
    }

    pub fn caster(&self) -> EntityId {
        self.caster
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn source_spell(&self) -> u16 {
        self.source_spell
    }

    /// Remaining duration, zero for pulsed effects past their window.
    pub fn remaining_ms(&self, now: TimePoint) -> u64 {
        match self.shape {
            EffectShape::Single { expires_at, .. } => expires_at.0.saturating_sub(now.0),
            EffectShape::Pulsed {
                pulses_left,
                interval_ms,
                next_pulse_at,
            } => {
                next_pulse_at.0.saturating_sub(now.0)
                    + interval_ms * pulses_left.saturating_sub(1) as u64
            }
        }
    }

    pub fn remaining_pulses(&self) -> u32 {
        match self.shape {
            EffectShape::Single { .. } => 0,
            EffectShape::Pulsed { pulses_left, .. } => pulses_left,
        }
    }

    /// Whether the instance is still live. Protected corpse kinds stay
    /// valid until explicitly removed.
    pub fn is_valid(&self, now: TimePoint, owner_alive: bool) -> bool {
        if self.cancelled {
            return false;
        }
        if self.kind.is_protected() {
            return true;
        }
        match self.shape {
            EffectShape::Single { expires_at, .. } => now < expires_at,
            EffectShape::Pulsed { pulses_left, .. } => {
                pulses_left > 0 && (owner_alive || !self.kind.ends_on_death())
            }
        }
    }

    /// Merge path for a re-applied effect that did not win the overwrite
    /// comparison: timing and caster are refreshed, the established power
    /// stands.
    pub fn change_data(
        &mut self,
        now: TimePoint,
        _power: Magnitude,
        duration_secs: u32,
        pulses: u32,
        caster: EntityId,
    ) {
        self.caster = caster;
        match &mut self.shape {
            EffectShape::Single { expires_at, .. } => {
                *expires_at = now.plus_ms(duration_secs as u64 * 1_000);
            }
            EffectShape::Pulsed { pulses_left, .. } => {
                *pulses_left = pulses.max(1);
            }
        }
    }

    /// Advances this instance one scheduler pass, emitting payload pulses.
    ///
    /// `caster_near` reports whether the original caster is still present
    /// within the given range; prayer self-cancels when it is not.
    pub fn tick(
        &mut self,
        now: TimePoint,
        owner: &OwnerView,
        caster_near: &dyn Fn(EntityId, u16) -> bool,
        out: &mut Vec<StatusPulse>,
    ) {
        match &mut self.shape {
            EffectShape::Single { next_sub_at, .. } => {
                let Some(sub_at) = next_sub_at else { return };
                if !sub_at.elapsed(now) {
                    return;
                }
                *sub_at = now.plus_ms(CombatConfig::STATUS_SUB_INTERVAL_MS);
                match self.kind {
                    StatusKind::Prayer => {
                        if caster_near(self.caster, Self::PRAYER_RANGE) {
                            out.push(StatusPulse::StaminaNudge {
                                amount: Self::PRAYER_STAMINA,
                            });
                        } else {
                            self.cancelled = true;
                        }
                    }
                    _ => {}
                }
            }
            EffectShape::Pulsed {
                pulses_left,
                interval_ms,
                next_pulse_at,
            } => {
                if *pulses_left == 0 || !next_pulse_at.elapsed(now) {
                    return;
                }
                *next_pulse_at = now.plus_ms(*interval_ms);
                *pulses_left -= 1;
                match self.kind {
                    StatusKind::Poison => {
                        let mut amount = match self.power {
                            Magnitude::Flat(v) => v.max(0) as u32,
                            Magnitude::Percent(p) => {
                                (owner.max_life as u64 * p.max(0) as u64 / 100) as u32
                            }
                        };
                        amount = amount.min(CombatConfig::POISON_PULSE_CAP);
                        if owner.life < CombatConfig::POISON_LOW_LIFE {
                            amount = amount.min((owner.life / 2).max(1));
                        }
                        // Poison never finishes the owner off.
                        amount = amount.min(owner.life.saturating_sub(1));
                        if amount > 0 {
                            out.push(StatusPulse::Damage {
                                kind: StatusKind::Poison,
                                caster: self.caster,
                                amount,
                            });
                        }
                    }
                    StatusKind::LifeBurn => {
                        let pct = match self.power {
                            Magnitude::Percent(p) => p.max(0) as u32,
                            Magnitude::Flat(v) => v.max(0) as u32,
                        };
                        let amount = (owner.life as u64 * pct.min(100) as u64 / 100) as u32;
                        if amount > 0 {
                            out.push(StatusPulse::Damage {
                                kind: StatusKind::LifeBurn,
                                caster: self.caster,
                                amount,
                            });
                        }
                    }
                    StatusKind::Vortex => {
                        out.push(StatusPulse::AuraRecast {
                            spell_id: self.source_spell,
                            level: self.level,
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}
