//! Outbound events and write-behind persistence commands.
//!
//! The core never performs I/O. Every externally visible outcome of a tick
//! (effect broadcasts, deaths, status syncs, persistence writes) lands in
//! the [`Outbox`], and the partition lane drains it after each pass.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;
use crate::state::{EntityId, Position};
use crate::status::{StatusKind, StatusRecord};

/// How a victim died, for the death animation and drop rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DieMode {
    #[default]
    Normal,
    /// Final blow exceeded a third of the victim's max life.
    Overkill,
}

/// One victim entry inside an effect broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectTarget {
    pub id: EntityId,
    pub damage: u32,
    pub lethal: bool,
}

/// Targets carried by one effect packet. Larger target sets are split
/// across several events by [`Outbox::push_effect`].
pub type EffectChunk = ArrayVec<EffectTarget, { CombatConfig::MAX_EFFECT_TARGETS }>;

/// Abstract broadcast events; framing and transport live outside the core.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutboundEvent {
    /// Melee swing outcome. A single zero-damage target entry means a miss.
    AttackEffect {
        attacker: EntityId,
        targets: EffectChunk,
    },
    /// Spell payload outcome, chunked at the packet target limit.
    MagicEffect {
        caster: EntityId,
        spell_id: u16,
        level: u8,
        targets: EffectChunk,
    },
    /// Cast attempt notice shown to observers during the intone window.
    CastAttempt {
        caster: EntityId,
        spell_id: u16,
        level: u8,
        target: EntityId,
        ground: Position,
    },
    /// An intoning or channeled cast was cancelled.
    AbilityAborted { owner: EntityId },
    /// The owner's status flag word changed; clients re-sync auras.
    StatusFlagsChanged { owner: EntityId, flags: u64 },
    /// Fatal-strike teleport; observers replay the jump.
    FatalStrikeJump {
        attacker: EntityId,
        from: Position,
        to: Position,
    },
    Death {
        victim: EntityId,
        killer: EntityId,
        mode: DieMode,
    },
    /// The runtime owns entity creation; summon payloads request it.
    SummonRequested { owner: EntityId, template: u16 },
}

/// Best-effort persistence commands drained by the write-behind worker.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PersistCommand {
    SaveStatus(StatusRecord),
    DeleteStatus { owner: EntityId, kind: StatusKind },
}

/// Per-tick accumulator for events and persistence commands.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<OutboundEvent>,
    persist: Vec<PersistCommand>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: OutboundEvent) {
        self.events.push(event);
    }

    /// Emits an attack or magic effect, splitting the target list into
    /// packet-sized chunks. `spell` selects the magic framing.
    pub fn push_effect(
        &mut self,
        attacker: EntityId,
        spell: Option<(u16, u8)>,
        targets: &[EffectTarget],
    ) {
        if targets.is_empty() {
            return;
        }
        for chunk in targets.chunks(CombatConfig::MAX_EFFECT_TARGETS) {
            let targets: EffectChunk = chunk.iter().copied().collect();
            self.events.push(match spell {
                Some((spell_id, level)) => OutboundEvent::MagicEffect {
                    caster: attacker,
                    spell_id,
                    level,
                    targets,
                },
                None => OutboundEvent::AttackEffect { attacker, targets },
            });
        }
    }

    pub fn persist(&mut self, command: PersistCommand) {
        self.persist.push(command);
    }

    pub fn events(&self) -> &[OutboundEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_persist(&mut self) -> Vec<PersistCommand> {
        std::mem::take(&mut self.persist)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.persist.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_broadcast_chunks_at_packet_limit() {
        let mut outbox = Outbox::new();
        let targets: Vec<EffectTarget> = (1..=60)
            .map(|i| EffectTarget {
                id: EntityId(i),
                damage: i,
                lethal: false,
            })
            .collect();
        outbox.push_effect(EntityId(7), Some((1000, 3)), &targets);

        let events = outbox.drain_events();
        assert_eq!(events.len(), 3);
        let sizes: Vec<usize> = events
            .iter()
            .map(|e| match e {
                OutboundEvent::MagicEffect { targets, .. } => targets.len(),
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn empty_target_list_emits_nothing() {
        let mut outbox = Outbox::new();
        outbox.push_effect(EntityId(7), None, &[]);
        assert!(outbox.is_empty());
    }
}
