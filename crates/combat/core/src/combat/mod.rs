//! DamageModel: hit resolution and damage magnitude computation.
//!
//! Pure functions over two combatants' stats plus an optional active spell
//! adjustment. All randomness comes in through the [`RngOracle`] seed, so
//! the same inputs always produce the same outcome.
//!
//! [`RngOracle`]: crate::env::RngOracle

mod hit;
mod magic;
mod physical;
pub mod tables;

pub use hit::{check_hit, hit_chance};
pub use magic::magic_damage;
pub use physical::physical_damage;
pub use tables::{NameTier, adjust_drop, adjust_experience, disdain_scale, name_tier, pvp_band};

/// Interaction tag reserved for reflect/absorb semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionEffect {
    #[default]
    None,
    Reflected,
    Absorbed,
}

/// Outcome of one damage computation.
///
/// `damage` is floored to 1 on every connecting path; 0 is the dodged/
/// blocked result produced by the caller, never by the formulas here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageResult {
    pub damage: u32,
    pub effect: InteractionEffect,
}

impl DamageResult {
    pub fn of(damage: u32) -> Self {
        Self {
            damage,
            effect: InteractionEffect::None,
        }
    }
}
