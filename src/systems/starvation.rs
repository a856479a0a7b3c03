use anyhow::Result;
use tracing::debug;

use crate::{
    agents::{AgentKind, SimulationState},
    engine::{System, SystemContext},
    rng::{RngExt, SystemRng},
};

use super::RuleSettings;

/// When prey run low, occasionally drops the newest predator.
pub struct StarvationSystem {
    prey_below: usize,
    predators_above: usize,
    chance: f64,
}

impl StarvationSystem {
    pub fn new(rules: &RuleSettings) -> Self {
        Self {
            prey_below: rules.starvation_prey_below,
            predators_above: rules.starvation_predators_above,
            chance: rules.starvation_chance,
        }
    }
}

impl Default for StarvationSystem {
    fn default() -> Self {
        Self::new(&RuleSettings::default())
    }
}

impl System for StarvationSystem {
    fn name(&self) -> &str {
        "starvation"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if state.prey_count() < self.prey_below
            && rng.chance(self.chance)
            && state.predator_count() > self.predators_above
        {
            if let Some(starved) = state.remove_newest(AgentKind::Predator) {
                debug!(tick = ctx.tick, predator = starved.id.raw(), "predator starved");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{agents::Position, rng::RngManager};

    fn certain_starvation() -> StarvationSystem {
        StarvationSystem::new(&RuleSettings {
            starvation_chance: 1.0,
            ..RuleSettings::default()
        })
    }

    fn run_once(system: &mut StarvationSystem, state: &mut SimulationState) {
        let mut rng = RngManager::new(4);
        let ctx = SystemContext {
            tick: 1,
            reserve_name: "Test",
        };
        system.run(&ctx, state, &mut rng.stream("starvation")).unwrap();
    }

    #[test]
    fn newest_predator_starves_when_prey_scarce() {
        let mut state = SimulationState::new();
        let oldest = state.spawn(AgentKind::Predator, Position::default());
        state.spawn(AgentKind::Predator, Position::default());
        let newest = state.spawn(AgentKind::Predator, Position::default());
        state.spawn(AgentKind::Prey, Position::default());

        run_once(&mut certain_starvation(), &mut state);

        assert_eq!(state.predator_count(), 2);
        assert!(state.agent(AgentKind::Predator, newest).is_none());
        assert!(state.agent(AgentKind::Predator, oldest).is_some());
    }

    #[test]
    fn two_predators_never_starve() {
        let mut state = SimulationState::new();
        state.spawn(AgentKind::Predator, Position::default());
        state.spawn(AgentKind::Predator, Position::default());
        run_once(&mut certain_starvation(), &mut state);
        assert_eq!(state.predator_count(), 2);
    }

    #[test]
    fn plenty_of_prey_prevents_starvation() {
        let mut state = SimulationState::new();
        for _ in 0..5 {
            state.spawn(AgentKind::Predator, Position::default());
        }
        for _ in 0..6 {
            state.spawn(AgentKind::Prey, Position::default());
        }
        run_once(&mut certain_starvation(), &mut state);
        assert_eq!(state.predator_count(), 5);
    }
}
