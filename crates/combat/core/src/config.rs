/// Combat tuning constants and per-map tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatConfig {
    /// Visibility range in cells. Targets beyond this are never resolvable,
    /// regardless of spell range.
    pub view_range: u16,
}

impl CombatConfig {
    // ===== hit resolution =====
    /// Default lower clamp for the effective hit rate.
    pub const HIT_RATE_FLOOR: u32 = 40;
    /// Lower clamp when a ranged attacker strikes a shield user.
    pub const HIT_RATE_FLOOR_VS_SHIELD: u32 = 25;
    /// Upper clamp for the effective hit rate. A hit is never guaranteed.
    pub const HIT_RATE_CEILING: u32 = 99;
    /// Flat accuracy bonus for a player attacking a non-player.
    pub const PVE_ACCURACY_BONUS: u32 = 60;

    // ===== damage pipeline =====
    /// Numerator of the ranged-vs-ranged player damage scale (out of 10000).
    pub const ARCHER_MIRROR_SCALE: u64 = 1125;
    /// Magic defense percent resist is capped here.
    pub const MAGIC_RESIST_CAP: u32 = 90;
    /// Damage above `max_life / OVERKILL_DIVISOR` selects the overkill
    /// die mode in the kill flow.
    pub const OVERKILL_DIVISOR: u32 = 3;

    // ===== threshold-encoded magnitudes =====
    /// Raw values at or above this are percent-encoded.
    pub const PERCENT_FLOOR: i32 = 30000;
    /// Splits percent-encoded values into the reduction band
    /// `[PERCENT_FLOOR, PERCENT_PIVOT)` and the boost band `[PERCENT_PIVOT, ..)`.
    pub const PERCENT_PIVOT: i32 = 30100;

    // ===== area payloads =====
    /// Fan payloads reach `spell range + FAN_RANGE_BONUS` cells.
    pub const FAN_RANGE_BONUS: u16 = 2;
    /// Fan half-angle in degrees.
    pub const FAN_HALF_ANGLE_DEG: f64 = 60.0;
    /// Line payloads skip cells whose elevation differs from the caster's
    /// cell by more than this.
    pub const LINE_ELEVATION_LIMIT: i32 = 26;

    // ===== broadcast =====
    /// Maximum targets carried by one magic/attack effect packet.
    pub const MAX_EFFECT_TARGETS: usize = 25;

    // ===== statuses =====
    /// Sub-interval for single effects that carry a periodic side payload.
    pub const STATUS_SUB_INTERVAL_MS: u64 = 1_000;
    /// Poison pulse damage is capped here per tick.
    pub const POISON_PULSE_CAP: u32 = 200;
    /// Below this life the poison pulse is diminished to a flat trickle.
    pub const POISON_LOW_LIFE: u32 = 100;

    // ===== compile-time bounds =====
    /// Upper bound on simultaneously active status kinds per combatant.
    pub const MAX_STATUS_EFFECTS: usize = 32;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_VIEW_RANGE: u16 = 18;

    pub fn new() -> Self {
        Self {
            view_range: Self::DEFAULT_VIEW_RANGE,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
