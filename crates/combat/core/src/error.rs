//! Cast rejection reasons.
//!
//! Every variant corresponds to a validation step in `begin_cast` that
//! failed before any state was touched; callers treat them as ordinary
//! no-op outcomes, not faults. [`CastError::PayloadFault`] is the one
//! exception: it reports a payload handler that bailed mid-dispatch, which
//! the runtime logs as a fizzled cast.

use crate::state::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CastError {
    #[error("unknown spell {id} level {level}")]
    UnknownSpell { id: u16, level: u8 },

    #[error("cooldown not elapsed")]
    Cooldown,

    #[error("proc chance failed")]
    ChanceFailed,

    #[error("spell category is banned on this map")]
    ForbiddenHere,

    #[error("insufficient mana, stamina, or ammunition")]
    Resources,

    #[error("required weapon subtype not equipped")]
    WrongWeapon,

    #[error("caster is transformed")]
    Transformed,

    #[error("flight rules forbid this cast")]
    FlightRules,

    #[error("no valid target in range")]
    NoTarget,

    #[error("caster {0:?} not found on this map")]
    NoCaster(EntityId),

    #[error("payload fault: {0}")]
    PayloadFault(&'static str),
}
