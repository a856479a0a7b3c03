use anyhow::Result;
use thiserror::Error;
use tracing::debug;

use crate::{
    agents::{seed_state, PopulationPlan, SimulationState, TickCounts},
    grid::GridSet,
    reserve::Reserve,
    rng::{RngManager, SystemRng},
    systems::{
        PredatorPursuitSystem, PreyMovementSystem, ReproductionSystem, RuleSettings,
        StarvationSystem,
    },
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("density grids for '{0}' have not settled yet")]
    GridsPending(String),
}

pub struct EngineSettings {
    pub reserve_name: String,
    /// `None` seeds every stream from entropy.
    pub seed: Option<u64>,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Prey movement, pursuit, reproduction, starvation, in that order.
    pub fn with_default_systems(self, rules: &RuleSettings) -> Self {
        self.with_system(PreyMovementSystem::new(rules))
            .with_system(PredatorPursuitSystem::new(rules))
            .with_system(ReproductionSystem::new(rules))
            .with_system(StarvationSystem::new(rules))
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::with_seed(self.settings.seed),
            systems: self.systems,
            settings: self.settings,
        }
    }
}

/// Runs the tick systems over a [`SimulationState`]. Holds no wall clock:
/// a tick happens exactly when [`Engine::tick`] is called.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn seed_state(
        &mut self,
        reserve: &Reserve,
        grids: &GridSet,
    ) -> Result<SimulationState, EngineError> {
        let mut rng = self.rng.stream("seeding");
        let plan = PopulationPlan::from_tiger_density(reserve.tiger_density, &mut rng);
        seed_state(&reserve.name, plan, grids, &mut rng)
    }

    /// Advances one tick and returns the counts after every system has run.
    pub fn tick(&mut self, state: &mut SimulationState) -> Result<TickCounts> {
        let ctx = SystemContext {
            tick: state.tick() + 1,
            reserve_name: &self.settings.reserve_name,
        };
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            system.run(&ctx, state, &mut rng_stream)?;
        }
        state.advance_tick();
        let counts = state.counts();
        debug!(
            tick = state.tick(),
            predators = counts.predator_count,
            prey = counts.prey_count,
            "tick complete"
        );
        Ok(counts)
    }

    pub fn run_with_hook<O: TickObserver>(
        &mut self,
        state: &mut SimulationState,
        ticks: u64,
        mut observer: O,
    ) -> Result<()> {
        for _ in 0..ticks {
            let counts = self.tick(state)?;
            observer.on_tick(counts);
        }
        Ok(())
    }
}

/// Receives counts at tick boundaries only.
pub trait TickObserver {
    fn on_tick(&mut self, counts: TickCounts);
}

impl<F: FnMut(TickCounts)> TickObserver for F {
    fn on_tick(&mut self, counts: TickCounts) {
        self(counts)
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub reserve_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}
