//! Area target collection: fan cones and rasterized lines.
//!
//! Geometry only. Alive/attackable/immunity filtering happens in the shared
//! area apply loop, so these return raw candidate ids in map iteration
//! order (ascending id, which keeps area payload application deterministic).

use crate::config::CombatConfig;
use crate::env::MapOracle;
use crate::state::{EntityId, MapState, Position};

/// Entities inside the fan cone from `origin` through `aim`.
///
/// The cone reaches `range + FAN_RANGE_BONUS` cells and opens
/// `FAN_HALF_ANGLE_DEG` to each side of the aim line. The caster's own cell
/// never matches. A degenerate aim on the caster's cell selects nothing.
pub fn fan_targets(
    state: &MapState,
    caster: EntityId,
    origin: Position,
    aim: Position,
    range: u16,
) -> Vec<EntityId> {
    if aim == origin {
        return Vec::new();
    }
    let reach = range.saturating_add(CombatConfig::FAN_RANGE_BONUS);
    let aim_angle = angle(origin, aim);

    state
        .iter()
        .filter(|c| c.id != caster && c.position != origin)
        .filter(|c| origin.distance(c.position) <= reach)
        .filter(|c| {
            let diff = (angle(origin, c.position) - aim_angle).abs();
            let diff = diff.min(360.0 - diff);
            diff <= CombatConfig::FAN_HALF_ANGLE_DEG
        })
        .map(|c| c.id)
        .collect()
}

fn angle(from: Position, to: Position) -> f64 {
    let dx = to.x as f64 - from.x as f64;
    let dy = to.y as f64 - from.y as f64;
    dy.atan2(dx).to_degrees()
}

/// Rasterizes the straight path of cells from `origin` toward `aim`, up to
/// `range` cells, excluding the origin cell itself.
pub fn line_cells(origin: Position, aim: Position, range: u16) -> Vec<Position> {
    if aim == origin || range == 0 {
        return Vec::new();
    }
    let dx = aim.x as f64 - origin.x as f64;
    let dy = aim.y as f64 - origin.y as f64;
    let len = dx.abs().max(dy.abs());
    let (step_x, step_y) = (dx / len, dy / len);

    let mut cells = Vec::with_capacity(range as usize);
    let mut last = origin;
    for i in 1..=range as i64 {
        let x = (origin.x as f64 + step_x * i as f64).round();
        let y = (origin.y as f64 + step_y * i as f64).round();
        if x < 0.0 || y < 0.0 || x > u16::MAX as f64 || y > u16::MAX as f64 {
            break;
        }
        let cell = Position::new(x as u16, y as u16);
        if cell != last {
            cells.push(cell);
            last = cell;
        }
    }
    cells
}

/// Entities on the rasterized line from the caster toward `aim`.
///
/// The path stops at the first impassable cell (no shooting through walls)
/// and skips any cell whose elevation differs from the caster's cell by
/// more than `LINE_ELEVATION_LIMIT`, even when the cell is on the path and
/// within range.
pub fn line_targets(
    state: &MapState,
    map: &dyn MapOracle,
    caster: EntityId,
    origin: Position,
    aim: Position,
    range: u16,
) -> Vec<EntityId> {
    let base_elevation = map.elevation(state.id, origin);
    let mut targets = Vec::new();
    for cell in line_cells(origin, aim, range) {
        if !map.is_passable(state.id, cell) {
            break;
        }
        let diff = map.elevation(state.id, cell) - base_elevation;
        if diff.abs() > CombatConfig::LINE_ELEVATION_LIMIT {
            continue;
        }
        targets.extend(
            state
                .iter()
                .filter(|c| c.id != caster && c.position == cell)
                .map(|c| c.id),
        );
    }
    targets
}
