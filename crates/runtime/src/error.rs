//! Runtime-side failures, distinct from in-engine cast rejections.

use combat_core::{CastError, MapId};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// No partition lane is registered for the map.
    #[error("no partition for map {0:?}")]
    UnknownMap(MapId),

    /// The lane task is gone; its channel is closed.
    #[error("partition lane closed")]
    LaneClosed,

    /// The engine rejected a dispatched cast.
    #[error(transparent)]
    Cast(#[from] CastError),
}
