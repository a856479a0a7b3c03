use anyhow::Result;

use crate::{
    agents::{AgentKind, Position, SimulationState},
    engine::{System, SystemContext},
    rng::{RngExt, SystemRng},
};

use super::RuleSettings;

/// Random walk for every prey, clamped to the terrain.
pub struct PreyMovementSystem {
    step: f64,
}

impl PreyMovementSystem {
    pub fn new(rules: &RuleSettings) -> Self {
        Self {
            step: rules.prey_step,
        }
    }
}

impl Default for PreyMovementSystem {
    fn default() -> Self {
        Self::new(&RuleSettings::default())
    }
}

impl System for PreyMovementSystem {
    fn name(&self) -> &str {
        "prey_movement"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for prey in state.population_mut(AgentKind::Prey).values_mut() {
            let dx = rng.uniform(-self.step, self.step);
            let dy = rng.uniform(-self.step, self.step);
            let target = Position::new(prey.position.x + dx, prey.position.y + dy);
            prey.move_to(target);
        }
        Ok(())
    }
}
