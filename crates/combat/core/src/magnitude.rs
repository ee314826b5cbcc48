//! Tagged flat/percent magnitudes.
//!
//! The data files encode "power" as one integer: values below 30000 are
//! flat amounts, values at or above it mean `raw - 30000` percent. That
//! encoding is decoded once at the content-loading boundary; everything in
//! this crate consumes only the tagged form.

use crate::config::CombatConfig;

/// Decoded spell/status magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Magnitude {
    Flat(i32),
    Percent(i32),
}

impl Magnitude {
    pub const NONE: Magnitude = Magnitude::Flat(0);

    /// Decodes a raw threshold-encoded value.
    pub fn decode(raw: i32) -> Magnitude {
        if raw >= CombatConfig::PERCENT_FLOOR {
            Magnitude::Percent(raw - CombatConfig::PERCENT_FLOOR)
        } else {
            Magnitude::Flat(raw)
        }
    }

    /// Re-encodes into the raw wire form.
    pub fn encode(self) -> i32 {
        match self {
            Magnitude::Flat(v) => v,
            Magnitude::Percent(p) => p + CombatConfig::PERCENT_FLOOR,
        }
    }

    pub fn is_percent(self) -> bool {
        matches!(self, Magnitude::Percent(_))
    }

    /// Applies this magnitude to a value: flat adds, percent scales.
    /// The result is clamped at zero.
    pub fn apply(self, value: u32) -> u32 {
        match self {
            Magnitude::Flat(v) => (value as i64 + v as i64).max(0) as u32,
            Magnitude::Percent(p) => ((value as i64 * p as i64) / 100).max(0) as u32,
        }
    }

    /// Applies only if this is a percent magnitude; flat values pass through
    /// unchanged. Several pipeline steps consume percent and flat parts at
    /// different stages.
    pub fn apply_percent_only(self, value: u32) -> u32 {
        match self {
            Magnitude::Percent(_) => self.apply(value),
            Magnitude::Flat(_) => value,
        }
    }

    /// Applies only if this is a flat magnitude.
    pub fn apply_flat_only(self, value: u32) -> u32 {
        match self {
            Magnitude::Flat(_) => self.apply(value),
            Magnitude::Percent(_) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_respects_threshold() {
        assert_eq!(Magnitude::decode(250), Magnitude::Flat(250));
        assert_eq!(Magnitude::decode(29_999), Magnitude::Flat(29_999));
        assert_eq!(Magnitude::decode(30_000), Magnitude::Percent(0));
        assert_eq!(Magnitude::decode(30_150), Magnitude::Percent(150));
    }

    #[test]
    fn encode_round_trips() {
        for raw in [0, 17, 29_999, 30_000, 30_050, 30_100, 31_000] {
            assert_eq!(Magnitude::decode(raw).encode(), raw);
        }
    }

    #[test]
    fn apply_scales_and_adds() {
        assert_eq!(Magnitude::Flat(40).apply(100), 140);
        assert_eq!(Magnitude::Flat(-200).apply(100), 0);
        assert_eq!(Magnitude::Percent(150).apply(100), 150);
        assert_eq!(Magnitude::Percent(50).apply(101), 50);
    }
}
