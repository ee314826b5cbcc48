//! Small identity and coordinate newtypes shared across the crate.

/// Unique identifier for a combatant on a map.
///
/// `0` is reserved as the "no entity" sentinel used by attack sessions and
/// spell casts to mean "no current target".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Sentinel meaning "no entity".
    pub const NONE: EntityId = EntityId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

/// Identifier of a map (one map == one partition lane).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapId(pub u32);

/// Cell coordinates on a map grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance, the metric used for ranges and view checks.
    pub fn distance(self, other: Position) -> u16 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }

    /// Cell one step past `other` on the line from `self` through `other`.
    ///
    /// Used by the fatal-strike teleport to land behind the target.
    /// Saturates at the grid edge.
    pub fn behind(self, other: Position) -> Position {
        let step = |from: u16, to: u16| -> u16 {
            match to.cmp(&from) {
                core::cmp::Ordering::Greater => to.saturating_add(1),
                core::cmp::Ordering::Less => to.saturating_sub(1),
                core::cmp::Ordering::Equal => to,
            }
        };
        Position::new(step(self.x, other.x), step(self.y, other.y))
    }
}

/// Monotonic timestamp in milliseconds since partition start.
///
/// All waiting in the combat core (intone windows, attack cooldowns, effect
/// durations) is a stored `TimePoint` compared against the tick driver's
/// current time. Nothing in this crate sleeps or suspends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimePoint(pub u64);

impl TimePoint {
    pub const ZERO: TimePoint = TimePoint(0);

    pub fn plus_ms(self, ms: u64) -> TimePoint {
        TimePoint(self.0.saturating_add(ms))
    }

    pub fn elapsed(self, now: TimePoint) -> bool {
        now >= self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_distance() {
        let a = Position::new(10, 10);
        assert_eq!(a.distance(Position::new(13, 11)), 3);
        assert_eq!(a.distance(Position::new(10, 10)), 0);
        assert_eq!(a.distance(Position::new(8, 17)), 7);
    }

    #[test]
    fn behind_steps_past_target() {
        let attacker = Position::new(10, 10);
        let target = Position::new(12, 10);
        assert_eq!(attacker.behind(target), Position::new(13, 10));

        let diagonal = Position::new(8, 8);
        assert_eq!(attacker.behind(diagonal), Position::new(7, 7));
    }
}
