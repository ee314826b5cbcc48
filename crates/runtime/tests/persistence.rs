//! Write-behind persistence: the queue worker and the full lane-to-store
//! path for a status attached in combat.

use std::sync::Arc;
use std::time::Duration;

use combat_content::SpellCatalog;
use combat_core::env::OpenFieldMap;
use combat_core::state::{ResourceMeter, RoleKind};
use combat_core::status::{StatusKind, StatusRecord};
use combat_core::{CombatantState, EntityId, MapId, MapState, PersistCommand, Position};
use runtime::{
    EventBus, MapPartition, MemoryStatusStore, PartitionConfig, PartitionEnv, PersistenceWorker,
    StatusStore,
};

fn fighter(id: u32, x: u16) -> CombatantState {
    let mut c = CombatantState {
        id: EntityId(id),
        kind: RoleKind::Player,
        position: Position::new(x, 10),
        alive: true,
        resources: ResourceMeter::full(400, 200, 100),
        ..Default::default()
    };
    c.stats.level = 50;
    c
}

#[tokio::test]
async fn worker_applies_saves_and_deletes_in_order() {
    let store = Arc::new(MemoryStatusStore::new());
    let (worker, tx) = PersistenceWorker::new(store.clone(), 16);
    let task = tokio::spawn(worker.run());

    let record = |kind: StatusKind| StatusRecord {
        owner: EntityId(4),
        kind,
        power_raw: 30_040,
        remaining_secs: 20,
        remaining_pulses: 0,
        level: 2,
    };
    tx.send(PersistCommand::SaveStatus(record(StatusKind::Stigma)))
        .await
        .unwrap();
    tx.send(PersistCommand::SaveStatus(record(StatusKind::Poison)))
        .await
        .unwrap();
    tx.send(PersistCommand::DeleteStatus {
        owner: EntityId(4),
        kind: StatusKind::Stigma,
    })
    .await
    .unwrap();
    drop(tx);
    task.await.unwrap();

    let records = store.load(EntityId(4)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, StatusKind::Poison);
}

#[tokio::test(start_paused = true)]
async fn attached_status_reaches_the_store_behind_the_lane() {
    let store = Arc::new(MemoryStatusStore::new());
    let (worker, persist_tx) = PersistenceWorker::new(store.clone(), 64);
    tokio::spawn(worker.run());

    let env = PartitionEnv::new(
        Arc::new(OpenFieldMap::new()),
        Arc::new(SpellCatalog::builtin()),
    );
    let handle = MapPartition::spawn(
        MapState::new(MapId(1)),
        env,
        PartitionConfig::default(),
        EventBus::default(),
        persist_tx,
    );

    handle.insert(fighter(1, 10)).await.unwrap();
    handle.insert(fighter(2, 11)).await.unwrap();

    // Stigma (1095) carries a status rider and no intone window, so the
    // save command is queued as soon as the cast is accepted.
    handle
        .begin_cast(EntityId(1), 1095, 1, EntityId(2), Position::default())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let records = store.load(EntityId(2)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, StatusKind::Stigma);
    assert!(records[0].remaining_secs > 0);

    handle.shutdown().await;
}
