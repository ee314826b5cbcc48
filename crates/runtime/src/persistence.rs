//! Write-behind persistence of status records.
//!
//! Partitions emit [`PersistCommand`]s into a bounded queue and move on;
//! this worker drains the queue against a [`StatusStore`]. A storage
//! failure is logged and the command dropped: losing an aura record across
//! a restart is acceptable, stalling a combat tick is not.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use combat_core::status::{StatusKind, StatusRecord};
use combat_core::{EntityId, PersistCommand};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("status store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("status record codec: {0}")]
    Codec(#[from] bincode::Error),
}

/// Durable storage for per-owner status records.
///
/// One record per (owner, kind), mirroring the registry's
/// one-instance-per-kind rule.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn save(&self, record: StatusRecord) -> Result<(), StoreError>;

    async fn delete(&self, owner: EntityId, kind: StatusKind) -> Result<(), StoreError>;

    /// Records for one owner, used when the entity re-enters a map.
    async fn load(&self, owner: EntityId) -> Result<Vec<StatusRecord>, StoreError>;
}

/// In-memory store for tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: RwLock<BTreeMap<(EntityId, StatusKind), StatusRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn save(&self, record: StatusRecord) -> Result<(), StoreError> {
        let key = (record.owner, record.kind);
        self.records.write().await.insert(key, record);
        Ok(())
    }

    async fn delete(&self, owner: EntityId, kind: StatusKind) -> Result<(), StoreError> {
        self.records.write().await.remove(&(owner, kind));
        Ok(())
    }

    async fn load(&self, owner: EntityId) -> Result<Vec<StatusRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .range((owner, StatusKind::AccuracyBoost)..=(owner, StatusKind::CorpseSeal))
            .map(|(_, r)| r.clone())
            .collect())
    }
}

/// File-backed store: one bincode file per owner under `dir`.
///
/// Save and delete read-modify-write the owner's file. The single
/// [`PersistenceWorker`] task serializes access, so there is no file
/// locking here.
#[derive(Debug)]
pub struct BincodeStatusStore {
    dir: PathBuf,
}

impl BincodeStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, owner: EntityId) -> PathBuf {
        self.dir.join(format!("{:08}.status", owner.0))
    }

    async fn read_records(&self, owner: EntityId) -> Result<Vec<StatusRecord>, StoreError> {
        match tokio::fs::read(self.path_for(owner)).await {
            Ok(bytes) => Ok(bincode::deserialize(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_records(
        &self,
        owner: EntityId,
        records: &[StatusRecord],
    ) -> Result<(), StoreError> {
        let path = self.path_for(owner);
        if records.is_empty() {
            // Last record gone: drop the file instead of leaving an empty one.
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bincode::serialize(&records)?).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for BincodeStatusStore {
    async fn save(&self, record: StatusRecord) -> Result<(), StoreError> {
        let owner = record.owner;
        let mut records = self.read_records(owner).await?;
        match records.iter_mut().find(|r| r.kind == record.kind) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        self.write_records(owner, &records).await
    }

    async fn delete(&self, owner: EntityId, kind: StatusKind) -> Result<(), StoreError> {
        let mut records = self.read_records(owner).await?;
        records.retain(|r| r.kind != kind);
        self.write_records(owner, &records).await
    }

    async fn load(&self, owner: EntityId) -> Result<Vec<StatusRecord>, StoreError> {
        self.read_records(owner).await
    }
}

/// Drains the persistence queue against a [`StatusStore`].
pub struct PersistenceWorker {
    store: Arc<dyn StatusStore>,
    rx: mpsc::Receiver<PersistCommand>,
}

impl PersistenceWorker {
    /// Returns the worker and the sender side of its queue. `capacity`
    /// bounds how many commands may be in flight before partitions start
    /// dropping writes.
    pub fn new(
        store: Arc<dyn StatusStore>,
        capacity: usize,
    ) -> (Self, mpsc::Sender<PersistCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { store, rx }, tx)
    }

    /// Runs until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            let result = match command {
                PersistCommand::SaveStatus(record) => self.store.save(record).await,
                PersistCommand::DeleteStatus { owner, kind } => {
                    self.store.delete(owner, kind).await
                }
            };
            if let Err(error) = result {
                warn!(%error, "status write-behind failed");
            }
        }
        debug!("persistence queue closed, worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: u32, kind: StatusKind, secs: u32) -> StatusRecord {
        StatusRecord {
            owner: EntityId(owner),
            kind,
            power_raw: 30_050,
            remaining_secs: secs,
            remaining_pulses: 0,
            level: 1,
        }
    }

    #[tokio::test]
    async fn memory_store_keeps_one_record_per_kind() {
        let store = MemoryStatusStore::new();
        store
            .save(record(5, StatusKind::Stigma, 60))
            .await
            .unwrap();
        store
            .save(record(5, StatusKind::Stigma, 30))
            .await
            .unwrap();
        store.save(record(5, StatusKind::Poison, 10)).await.unwrap();
        store.save(record(6, StatusKind::Poison, 10)).await.unwrap();

        let records = store.load(EntityId(5)).await.unwrap();
        assert_eq!(records.len(), 2);
        let stigma = records
            .iter()
            .find(|r| r.kind == StatusKind::Stigma)
            .unwrap();
        assert_eq!(stigma.remaining_secs, 30);

        store.delete(EntityId(5), StatusKind::Poison).await.unwrap();
        assert_eq!(store.load(EntityId(5)).await.unwrap().len(), 1);
        assert_eq!(store.load(EntityId(6)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bincode_store_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = BincodeStatusStore::new(dir.path());
        store
            .save(record(9, StatusKind::Stigma, 45))
            .await
            .unwrap();
        store.save(record(9, StatusKind::Poison, 0)).await.unwrap();

        let reopened = BincodeStatusStore::new(dir.path());
        let records = reopened.load(EntityId(9)).await.unwrap();
        assert_eq!(records.len(), 2);

        reopened
            .delete(EntityId(9), StatusKind::Stigma)
            .await
            .unwrap();
        reopened
            .delete(EntityId(9), StatusKind::Poison)
            .await
            .unwrap();
        assert!(reopened.load(EntityId(9)).await.unwrap().is_empty());
        // Empty owner means no file left behind.
        assert!(!dir.path().join("00000009.status").exists());
    }

    #[tokio::test]
    async fn deleting_from_an_empty_store_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = BincodeStatusStore::new(dir.path());
        store
            .delete(EntityId(1), StatusKind::Poison)
            .await
            .unwrap();
        assert!(store.load(EntityId(1)).await.unwrap().is_empty());
    }
}
