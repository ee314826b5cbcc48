//! Spell and status content: raw data shapes, JSON loaders, and the
//! built-in catalog.
//!
//! Data files carry magnitudes in the legacy threshold encoding (values at
//! or above 30000 mean percent). That encoding is decoded here, at the
//! loading boundary, into the tagged [`Magnitude`] form; nothing past this
//! crate ever sees a raw value.
//!
//! [`Magnitude`]: combat_core::Magnitude

mod builtin;
mod catalog;

pub use catalog::{ContentError, RiderEntry, SpellCatalog, SpellEntry};
