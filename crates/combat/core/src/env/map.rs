//! Map/world query surface consumed by the combat core.
//!
//! The world (map loading, region tables, terrain) lives outside this crate;
//! the engine only asks these read-only questions.

use crate::env::SpellCategory;
use crate::state::{MapId, Position};

/// Read-only map geometry and region predicates.
pub trait MapOracle: Send + Sync {
    /// Visibility range in cells; targets past this are never resolvable.
    fn view_range(&self, map: MapId) -> u16;

    /// Ground elevation at a cell. Line payloads reject cells whose
    /// elevation differs too much from the caster's cell.
    fn elevation(&self, map: MapId, position: Position) -> i32;

    /// Whether a cell can be stood on / traversed by a spell path.
    fn is_passable(&self, map: MapId, position: Position) -> bool;

    /// Player-vs-player combat is disabled on this map.
    fn pk_disabled(&self, map: MapId) -> bool;

    /// This cell is under PK protection (safe zone).
    fn pk_protected(&self, map: MapId, position: Position) -> bool;

    /// Training ground: resource/ammo costs are waived and casts auto-repeat.
    fn is_training(&self, map: MapId) -> bool;

    /// Flight is forbidden on this map.
    fn no_fly(&self, map: MapId) -> bool;

    /// Only line-shaped skills may be used on this map.
    fn line_skill_only(&self, map: MapId) -> bool;

    /// Whether this map bans a whole spell category (e.g. no transforms
    /// inside cities).
    fn forbids_category(&self, map: MapId, category: SpellCategory) -> bool;
}

/// Open-field defaults: flat, passable, everything allowed.
///
/// Tests and tools use this directly; the server runtime wraps its region
/// tables in its own implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenFieldMap {
    pub view_range: u16,
}

impl OpenFieldMap {
    pub fn new() -> Self {
        Self {
            view_range: crate::config::CombatConfig::DEFAULT_VIEW_RANGE,
        }
    }
}

impl MapOracle for OpenFieldMap {
    fn view_range(&self, _map: MapId) -> u16 {
        self.view_range
    }

    fn elevation(&self, _map: MapId, _position: Position) -> i32 {
        0
    }

    fn is_passable(&self, _map: MapId, _position: Position) -> bool {
        true
    }

    fn pk_disabled(&self, _map: MapId) -> bool {
        false
    }

    fn pk_protected(&self, _map: MapId, _position: Position) -> bool {
        false
    }

    fn is_training(&self, _map: MapId) -> bool {
        false
    }

    fn no_fly(&self, _map: MapId) -> bool {
        false
    }

    fn line_skill_only(&self, _map: MapId) -> bool {
        false
    }

    fn forbids_category(&self, _map: MapId, _category: SpellCategory) -> bool {
        false
    }
}
