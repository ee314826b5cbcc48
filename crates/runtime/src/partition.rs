//! The partition lane: one map, one task, one writer.
//!
//! A [`MapPartition`] owns its [`MapState`] outright. Every mutation, from
//! gateway commands to the combat tick itself, runs on the lane task, so
//! ordering is the channel's FIFO order and determinism falls out of the
//! engine's seeded rolls. The outbox is drained after every engine entry:
//! events to the bus, persistence commands to the write-behind queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use combat_core::env::{
    CombatEnv, EventHook, MapOracle, NullEvents, NullScript, PcgRng, RngOracle, ScriptHook,
    SpellOracle,
};
use combat_core::{
    CombatEngine, CombatantState, EntityId, MapId, MapState, Outbox, PersistCommand, Position,
    TimePoint,
};

use crate::error::RuntimeError;
use crate::events::EventBus;

/// Boxed engine command run on the lane.
pub type WorkFn = Box<dyn FnOnce(TimePoint, &mut CombatEngine<'_>) + Send>;
/// Boxed direct state edit (spawns, despawns, movement sync).
pub type StateFn = Box<dyn FnOnce(&mut MapState) + Send>;
/// Boxed read-only query.
pub type QueryFn = Box<dyn FnOnce(&MapState) + Send>;

/// What a lane task can be asked to do.
pub enum LaneCommand {
    /// Run a combat command through the engine, then drain the outbox.
    Work(WorkFn),
    /// Edit map state outside the engine. Nothing here rolls dice or emits
    /// events, so the outbox stays untouched.
    Mutate(StateFn),
    Query(QueryFn),
    /// Stop the lane once in-flight commands are done.
    Shutdown,
}

/// Owned oracle bundle a partition runs against.
#[derive(Clone)]
pub struct PartitionEnv {
    pub map: Arc<dyn MapOracle>,
    pub spells: Arc<dyn SpellOracle>,
    pub rng: Arc<dyn RngOracle>,
    pub script: Arc<dyn ScriptHook>,
    pub events: Arc<dyn EventHook>,
}

impl PartitionEnv {
    /// Geometry and spell data are mandatory; randomness defaults to
    /// [`PcgRng`] and both hook seams to no-ops.
    pub fn new(map: Arc<dyn MapOracle>, spells: Arc<dyn SpellOracle>) -> Self {
        Self {
            map,
            spells,
            rng: Arc::new(PcgRng),
            script: Arc::new(NullScript),
            events: Arc::new(NullEvents),
        }
    }

    pub fn with_rng(mut self, rng: Arc<dyn RngOracle>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_script(mut self, script: Arc<dyn ScriptHook>) -> Self {
        self.script = script;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventHook>) -> Self {
        self.events = events;
        self
    }
}

/// Lane tuning knobs.
#[derive(Clone, Copy, Debug)]
pub struct PartitionConfig {
    /// Combat tick period.
    pub tick_interval: Duration,
    /// Command queue depth before senders wait.
    pub lane_capacity: usize,
    /// Session seed behind every deterministic roll on this partition.
    pub session_seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            lane_capacity: 256,
            session_seed: 0,
        }
    }
}

/// The lane task. Constructed and consumed by [`MapPartition::spawn`].
pub struct MapPartition {
    state: MapState,
    env: PartitionEnv,
    config: PartitionConfig,
    rx: mpsc::Receiver<LaneCommand>,
    bus: EventBus,
    persist_tx: mpsc::Sender<PersistCommand>,
    outbox: Outbox,
    started: Instant,
    nonce: u64,
}

impl MapPartition {
    /// Spawns the lane task and returns its handle.
    pub fn spawn(
        state: MapState,
        env: PartitionEnv,
        config: PartitionConfig,
        bus: EventBus,
        persist_tx: mpsc::Sender<PersistCommand>,
    ) -> PartitionHandle {
        let map = state.id;
        let (tx, rx) = mpsc::channel(config.lane_capacity);
        let partition = Self {
            state,
            env,
            config,
            rx,
            bus,
            persist_tx,
            outbox: Outbox::new(),
            started: Instant::now(),
            nonce: 0,
        };
        let task = tokio::spawn(partition.run());
        PartitionHandle { map, tx, task }
    }

    /// Lane-local monotonic clock, in milliseconds since spawn.
    fn now(&self) -> TimePoint {
        TimePoint(self.started.elapsed().as_millis() as u64)
    }

    /// Builds an engine over the owned state, runs `f`, and carries the
    /// roll nonce forward so replays stay aligned across engine instances.
    fn with_engine<R>(&mut self, f: impl FnOnce(TimePoint, &mut CombatEngine<'_>) -> R) -> R {
        let now = self.now();
        let env = CombatEnv::new(
            self.env.map.as_ref(),
            self.env.spells.as_ref(),
            self.env.rng.as_ref(),
            self.env.script.as_ref(),
            self.env.events.as_ref(),
        );
        let mut engine = CombatEngine::new(
            &mut self.state,
            env,
            &mut self.outbox,
            self.config.session_seed,
            self.nonce,
        );
        let out = f(now, &mut engine);
        self.nonce = engine.nonce();
        out
    }

    fn drain_outbox(&mut self) {
        for event in self.outbox.drain_events() {
            self.bus.publish(event);
        }
        for command in self.outbox.drain_persist() {
            // Best effort: persistence backpressure never stalls the lane.
            if let Err(error) = self.persist_tx.try_send(command) {
                warn!(map = self.state.id.0, %error, "dropping status write");
            }
        }
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(map = self.state.id.0, "partition lane running");

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(LaneCommand::Work(work)) => {
                        self.with_engine(|now, engine| work(now, engine));
                        self.drain_outbox();
                    }
                    Some(LaneCommand::Mutate(edit)) => edit(&mut self.state),
                    Some(LaneCommand::Query(read)) => read(&self.state),
                    Some(LaneCommand::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    self.with_engine(|now, engine| engine.tick(now));
                    self.drain_outbox();
                }
            }
        }

        debug!(map = self.state.id.0, "partition lane stopped");
    }
}

/// Caller-side handle on one lane.
pub struct PartitionHandle {
    map: MapId,
    tx: mpsc::Sender<LaneCommand>,
    task: JoinHandle<()>,
}

impl PartitionHandle {
    pub fn map(&self) -> MapId {
        self.map
    }

    async fn send(&self, command: LaneCommand) -> Result<(), RuntimeError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::LaneClosed)
    }

    /// Queues a combat command for the lane.
    pub async fn dispatch<F>(&self, work: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(TimePoint, &mut CombatEngine<'_>) + Send + 'static,
    {
        self.send(LaneCommand::Work(Box::new(work))).await
    }

    /// Queues a direct state edit.
    pub async fn mutate<F>(&self, edit: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&mut MapState) + Send + 'static,
    {
        self.send(LaneCommand::Mutate(Box::new(edit))).await
    }

    /// Runs a read-only query and waits for its result.
    pub async fn query<F, R>(&self, read: F) -> Result<R, RuntimeError>
    where
        F: FnOnce(&MapState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(LaneCommand::Query(Box::new(move |state| {
            let _ = tx.send(read(state));
        })))
        .await?;
        rx.await.map_err(|_| RuntimeError::LaneClosed)
    }

    pub async fn insert(&self, combatant: CombatantState) -> Result<(), RuntimeError> {
        self.mutate(move |state| state.insert(combatant)).await
    }

    pub async fn remove(&self, id: EntityId) -> Result<(), RuntimeError> {
        self.mutate(move |state| {
            state.remove(id);
        })
        .await
    }

    pub async fn combatant(&self, id: EntityId) -> Result<Option<CombatantState>, RuntimeError> {
        self.query(move |state| state.get(id).cloned()).await
    }

    /// Starts a cast on the lane and waits for the engine's verdict.
    pub async fn begin_cast(
        &self,
        caster: EntityId,
        spell_id: u16,
        level: u8,
        target: EntityId,
        ground: Position,
    ) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.dispatch(move |now, engine| {
            let _ = tx.send(engine.begin_cast(now, caster, spell_id, level, target, ground));
        })
        .await?;
        rx.await.map_err(|_| RuntimeError::LaneClosed)??;
        Ok(())
    }

    pub async fn begin_target(
        &self,
        attacker: EntityId,
        target: EntityId,
    ) -> Result<(), RuntimeError> {
        self.dispatch(move |_, engine| engine.begin_target(attacker, target))
            .await
    }

    /// Stops the lane and waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.tx.send(LaneCommand::Shutdown).await;
        let _ = self.task.await;
    }
}
