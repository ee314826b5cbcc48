//! Per-map authoritative combat state.
//!
//! A [`MapState`] owns every combatant bound to one map. The runtime binds
//! each map to exactly one partition lane, so nothing here needs interior
//! mutability or locks: single-writer-per-partition is enforced
//! architecturally, not by containers.

mod combatant;
mod common;

pub use combatant::{
    CapabilityFlags, CombatantState, Profession, ResourceMeter, RoleKind, StatBlock,
};
pub use common::{EntityId, MapId, Position, TimePoint};

// BTreeMap keeps the tick pass iteration order deterministic across runs.
use std::collections::BTreeMap;

/// All combatants on one map, keyed by entity id.
#[derive(Clone, Debug, Default)]
pub struct MapState {
    pub id: MapId,
    combatants: BTreeMap<EntityId, CombatantState>,
}

impl MapState {
    pub fn new(id: MapId) -> Self {
        Self {
            id,
            combatants: BTreeMap::new(),
        }
    }

    /// Inserts a combatant, replacing any previous entity with the same id.
    pub fn insert(&mut self, mut combatant: CombatantState) {
        combatant.map = self.id;
        self.combatants.insert(combatant.id, combatant);
    }

    /// Removes a combatant when it leaves the map.
    pub fn remove(&mut self, id: EntityId) -> Option<CombatantState> {
        self.combatants.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&CombatantState> {
        if id.is_none() {
            return None;
        }
        self.combatants.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut CombatantState> {
        if id.is_none() {
            return None;
        }
        self.combatants.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.combatants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CombatantState> {
        self.combatants.values()
    }

    /// Ids in ascending order. The tick driver snapshots this so entities
    /// added mid-pass are picked up next pass, not this one.
    pub fn ids(&self) -> Vec<EntityId> {
        self.combatants.keys().copied().collect()
    }

    /// Entities within `radius` cells of `center` (Chebyshev), id order.
    pub fn in_radius(&self, center: Position, radius: u16) -> Vec<EntityId> {
        self.combatants
            .values()
            .filter(|c| c.position.distance(center) <= radius)
            .map(|c| c.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(id: u32, x: u16, y: u16) -> CombatantState {
        CombatantState {
            id: EntityId(id),
            position: Position::new(x, y),
            alive: true,
            ..Default::default()
        }
    }

    #[test]
    fn radius_query_uses_chebyshev() {
        let mut state = MapState::new(MapId(1));
        state.insert(dummy(1, 10, 10));
        state.insert(dummy(2, 13, 10));
        state.insert(dummy(3, 10, 14));

        let near = state.in_radius(Position::new(10, 10), 3);
        assert_eq!(near, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn ids_are_ascending() {
        let mut state = MapState::new(MapId(1));
        state.insert(dummy(7, 0, 0));
        state.insert(dummy(2, 0, 0));
        state.insert(dummy(5, 0, 0));
        assert_eq!(state.ids(), vec![EntityId(2), EntityId(5), EntityId(7)]);
    }
}
