//! Partition-per-map combat runtime.
//!
//! Each map's authoritative state lives on exactly one tokio task, its
//! partition lane. Commands and the tick timer are serialized through the
//! lane's channel, so combat state needs no locks and every tick replays
//! deterministically. Externally visible outcomes leave through the
//! broadcast [`EventBus`]; status records are persisted behind the loop by
//! the [`PersistenceWorker`], which may drop writes but never stalls a tick.

mod error;
mod events;
mod partition;
mod persistence;
mod router;

pub use error::RuntimeError;
pub use events::EventBus;
pub use partition::{
    LaneCommand, MapPartition, PartitionConfig, PartitionEnv, PartitionHandle,
};
pub use persistence::{
    BincodeStatusStore, MemoryStatusStore, PersistenceWorker, StatusStore, StoreError,
};
pub use router::PartitionRouter;
