//! Per-entity registry of timed buffs and debuffs.
//!
//! The registry enforces the one-instance-per-kind invariant structurally
//! (effects are keyed by kind) and keeps a u64 flag word mirroring the key
//! set for client sync. The two may never diverge, so the word is owned
//! here and only updated next to map mutations.

mod effect;

pub use effect::{EffectShape, OwnerView, StatusInstance, StatusKind, StatusPulse};

use std::collections::BTreeMap;

use crate::config::CombatConfig;
use crate::magnitude::Magnitude;
use crate::state::{EntityId, TimePoint};

/// What `apply` did with the incoming effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// No live instance existed; a new one was created.
    Created,
    /// The incoming values were judged stronger and replaced the instance.
    Overwritten,
    /// The incoming values were not stronger; timing was refreshed in place.
    Merged,
}

/// Everything a status tick produced, for the engine to act on.
#[derive(Debug, Default)]
pub struct StatusTickReport {
    pub pulses: Vec<StatusPulse>,
    pub expired: Vec<StatusKind>,
    /// The flag word changed; a sync event should go out.
    pub flags_changed: bool,
}

/// Persisted form of one status effect, written behind the combat loop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusRecord {
    pub owner: EntityId,
    pub kind: StatusKind,
    pub power_raw: i32,
    pub remaining_secs: u32,
    pub remaining_pulses: u32,
    pub level: u8,
}

/// Active timed effects on one combatant.
#[derive(Clone, Debug, Default)]
pub struct StatusRegistry {
    effects: BTreeMap<StatusKind, StatusInstance>,
    flags: u64,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrored bitmask of active kinds, for client sync.
    pub fn flags(&self) -> u64 {
        self.flags
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.effects.contains_key(&kind)
    }

    pub fn get(&self, kind: StatusKind) -> Option<&StatusInstance> {
        self.effects.get(&kind)
    }

    pub fn power_of(&self, kind: StatusKind) -> Option<Magnitude> {
        self.effects.get(&kind).map(|e| e.power())
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusInstance> {
        self.effects.values()
    }

    /// Applies an effect, resolving collisions with the banded power
    /// comparison:
    ///
    /// - raw (flat) values always overwrite;
    /// - percent values only overwrite a percent instance when they are
    ///   stronger within the same band — lower wins in the reduction band
    ///   below the pivot, higher wins in the boost band at or above it;
    /// - everything else merges via `change_data`, refreshing timing.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        now: TimePoint,
        caster: EntityId,
        kind: StatusKind,
        power: Magnitude,
        duration_secs: u32,
        pulses: u32,
        level: u8,
        source_spell: u16,
    ) -> ApplyOutcome {
        if let Some(existing) = self.effects.get_mut(&kind) {
            if Self::overwrites(power, existing.power()) {
                *existing = StatusInstance::new(
                    now,
                    kind,
                    power,
                    caster,
                    level,
                    source_spell,
                    duration_secs,
                    pulses,
                );
                return ApplyOutcome::Overwritten;
            }
            existing.change_data(now, power, duration_secs, pulses, caster);
            return ApplyOutcome::Merged;
        }

        if self.effects.len() >= CombatConfig::MAX_STATUS_EFFECTS {
            // Registry full; treat as a merge that did nothing.
            return ApplyOutcome::Merged;
        }
        self.effects.insert(
            kind,
            StatusInstance::new(
                now,
                kind,
                power,
                caster,
                level,
                source_spell,
                duration_secs,
                pulses,
            ),
        );
        self.flags |= kind.flag_bit();
        ApplyOutcome::Created
    }

    /// Removes an instance. Returns whether one existed.
    pub fn remove(&mut self, kind: StatusKind) -> bool {
        let existed = self.effects.remove(&kind).is_some();
        if existed {
            self.flags &= !kind.flag_bit();
        }
        existed
    }

    /// One scheduler pass over every instance: run payloads, then prune
    /// everything invalid except the protected terminal kinds.
    pub fn tick(
        &mut self,
        now: TimePoint,
        owner: &OwnerView,
        caster_near: &dyn Fn(EntityId, u16) -> bool,
    ) -> StatusTickReport {
        let mut report = StatusTickReport::default();

        for effect in self.effects.values_mut() {
            if effect.is_valid(now, owner.alive) {
                effect.tick(now, owner, caster_near, &mut report.pulses);
            }
        }

        let before = self.flags;
        self.effects.retain(|kind, effect| {
            if effect.is_valid(now, owner.alive) {
                true
            } else {
                report.expired.push(*kind);
                false
            }
        });
        for kind in &report.expired {
            self.flags &= !kind.flag_bit();
        }
        report.flags_changed = self.flags != before;
        report
    }

    /// Snapshot for the write-behind persistence sink.
    pub fn records(&self, owner: EntityId, now: TimePoint) -> Vec<StatusRecord> {
        self.effects
            .values()
            .map(|e| StatusRecord {
                owner,
                kind: e.kind(),
                power_raw: e.power().encode(),
                remaining_secs: (e.remaining_ms(now) / 1_000) as u32,
                remaining_pulses: e.remaining_pulses(),
                level: e.level(),
            })
            .collect()
    }

    /// Banded overwrite decision, preserving the raw-encoding thresholds.
    fn overwrites(new: Magnitude, old: Magnitude) -> bool {
        let pivot = CombatConfig::PERCENT_PIVOT - CombatConfig::PERCENT_FLOOR;
        match (new, old) {
            // Raw values always overwrite.
            (Magnitude::Flat(_), _) => true,
            // Percent over raw is a cross-band comparison: merge.
            (Magnitude::Percent(_), Magnitude::Flat(_)) => false,
            (Magnitude::Percent(n), Magnitude::Percent(o)) => {
                let (n_low, o_low) = (n < pivot, o < pivot);
                if n_low != o_low {
                    return false;
                }
                if n_low {
                    // Reduction band: a deeper reduction is stronger.
                    n < o
                } else {
                    // Boost band: a bigger boost is stronger.
                    n > o
                }
            }
        }
    }
}
