//! Fixed-cadence driver that owns one running simulation.
//!
//! The driver task resolves the reserve's grids, seeds the agents and then
//! calls [`Engine::tick`] once per period. Counts go out on a broadcast
//! channel and a full [`AgentSnapshot`] is published on a watch channel after
//! every tick, so readers never see a half-applied tick.

use std::{sync::Arc, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use tokio::{
    sync::{broadcast, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::info;

use crate::{
    agents::{AgentSnapshot, TickCounts},
    engine::Engine,
    provider::{load_grids, DensityGridProvider},
    reserve::Reserve,
};

const COUNTS_CAPACITY: usize = 256;

/// Counts published after a tick, tagged with the tick they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickUpdate {
    pub tick: u64,
    #[serde(flatten)]
    pub counts: TickCounts,
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub tick_period: Duration,
    /// Stop on its own after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            max_ticks: None,
        }
    }
}

pub struct SimulationHandle {
    reserve: String,
    counts_tx: broadcast::Sender<TickUpdate>,
    first_rx: Option<broadcast::Receiver<TickUpdate>>,
    snapshots: watch::Receiver<Option<AgentSnapshot>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<u64>>>,
}

impl SimulationHandle {
    pub fn spawn<P>(
        provider: Arc<P>,
        reserve: Reserve,
        engine: Engine,
        settings: DriverSettings,
    ) -> Self
    where
        P: DensityGridProvider + 'static,
    {
        let (counts_tx, first_rx) = broadcast::channel(COUNTS_CAPACITY);
        let (snapshot_tx, snapshots) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let name = reserve.name.clone();

        let task = tokio::spawn(drive(
            provider,
            reserve,
            engine,
            settings,
            counts_tx.clone(),
            snapshot_tx,
            shutdown_rx,
        ));

        Self {
            reserve: name,
            counts_tx,
            first_rx: Some(first_rx),
            snapshots,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn reserve(&self) -> &str {
        &self.reserve
    }

    /// Count stream. The first call also sees ticks that ran before it.
    pub fn subscribe(&mut self) -> broadcast::Receiver<TickUpdate> {
        self.first_rx
            .take()
            .unwrap_or_else(|| self.counts_tx.subscribe())
    }

    pub fn snapshots(&self) -> watch::Receiver<Option<AgentSnapshot>> {
        self.snapshots.clone()
    }

    /// Latest between-tick snapshot; `None` until seeding finishes.
    pub fn snapshot(&self) -> Option<AgentSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the driver to stop by itself. Returns the ticks run.
    pub async fn join(mut self) -> Result<u64> {
        self.await_task().await
    }

    /// Stops the driver and drops all agent and grid state. No tick runs
    /// after this returns.
    pub async fn dispose(mut self) -> Result<u64> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let ticks = self.await_task().await?;
        info!(reserve = %self.reserve, ticks, "simulation disposed");
        Ok(ticks)
    }

    async fn await_task(&mut self) -> Result<u64> {
        match self.task.take() {
            Some(task) => task.await.context("simulation task panicked")?,
            None => Ok(0),
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn drive<P>(
    provider: Arc<P>,
    reserve: Reserve,
    mut engine: Engine,
    settings: DriverSettings,
    counts_tx: broadcast::Sender<TickUpdate>,
    snapshot_tx: watch::Sender<Option<AgentSnapshot>>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<u64>
where
    P: DensityGridProvider + 'static,
{
    ensure!(
        !settings.tick_period.is_zero(),
        "tick period must be greater than zero"
    );

    // No timeout: a provider that never answers keeps the driver waiting
    // until it is disposed.
    let grids = tokio::select! {
        biased;
        _ = &mut shutdown => return Ok(0),
        grids = load_grids(provider.as_ref(), &reserve.name) => grids,
    };

    let mut state = engine.seed_state(&reserve, &grids)?;
    drop(grids);
    snapshot_tx.send_replace(Some(state.snapshot()));

    let mut interval = time::interval(settings.tick_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately.
    interval.tick().await;

    loop {
        if settings.max_ticks.is_some_and(|max| state.tick() >= max) {
            break;
        }
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let counts = engine.tick(&mut state)?;
                snapshot_tx.send_replace(Some(state.snapshot()));
                // No receivers is fine.
                let _ = counts_tx.send(TickUpdate {
                    tick: state.tick(),
                    counts,
                });
            }
        }
    }

    info!(reserve = %reserve.name, ticks = state.tick(), "simulation stopped");
    Ok(state.tick())
}
