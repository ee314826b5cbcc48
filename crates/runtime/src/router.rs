//! Map id to partition lane routing.

use std::collections::HashMap;

use combat_core::{CombatEngine, MapId, TimePoint};

use crate::error::RuntimeError;
use crate::partition::PartitionHandle;

/// Routes work to the lane owning each map.
///
/// Work aimed at another map is always re-dispatched through that map's
/// lane; no partition ever touches state it does not own.
#[derive(Default)]
pub struct PartitionRouter {
    lanes: HashMap<MapId, PartitionHandle>,
}

impl PartitionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a lane, replacing any previous lane for the same map.
    pub fn register(&mut self, handle: PartitionHandle) {
        self.lanes.insert(handle.map(), handle);
    }

    pub fn lane(&self, map: MapId) -> Result<&PartitionHandle, RuntimeError> {
        self.lanes.get(&map).ok_or(RuntimeError::UnknownMap(map))
    }

    pub fn contains(&self, map: MapId) -> bool {
        self.lanes.contains_key(&map)
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues a combat command on the lane owning `map`.
    pub async fn dispatch<F>(&self, map: MapId, work: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(TimePoint, &mut CombatEngine<'_>) + Send + 'static,
    {
        self.lane(map)?.dispatch(work).await
    }

    /// Stops every lane and waits for them all.
    pub async fn shutdown(self) {
        for (_, handle) in self.lanes {
            handle.shutdown().await;
        }
    }
}
