use anyhow::Result;

use crate::{
    agents::{AgentKind, Position, SimulationState},
    engine::{System, SystemContext},
    rng::{RngExt, SystemRng},
};

use super::RuleSettings;

/// Tops up small populations with at most one birth per kind per tick.
/// A birth needs a living parent of the same kind.
pub struct ReproductionSystem {
    rules: RuleSettings,
}

impl ReproductionSystem {
    pub fn new(rules: &RuleSettings) -> Self {
        Self {
            rules: rules.clone(),
        }
    }
}

impl Default for ReproductionSystem {
    fn default() -> Self {
        Self::new(&RuleSettings::default())
    }
}

impl System for ReproductionSystem {
    fn name(&self) -> &str {
        "reproduction"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        state: &mut SimulationState,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let rules = &self.rules;

        let prey = state.prey_count();
        if prey < rules.prey_birth_below && rng.chance(rules.prey_birth_chance) && prey > 0 {
            let extent = rules.prey_birth_extent;
            let spot = Position::new(rng.uniform(-extent, extent), rng.uniform(-extent, extent));
            state.spawn(AgentKind::Prey, spot);
        }

        let predators = state.predator_count();
        if predators < rules.predator_birth_below
            && rng.chance(rules.predator_birth_chance)
            && predators > 0
        {
            let extent = rules.predator_birth_extent;
            let spot = Position::new(rng.uniform(-extent, extent), rng.uniform(-extent, extent));
            state.spawn(AgentKind::Predator, spot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngManager;

    fn certain_births() -> RuleSettings {
        RuleSettings {
            prey_birth_chance: 1.0,
            predator_birth_chance: 1.0,
            ..RuleSettings::default()
        }
    }

    fn run_once(system: &mut ReproductionSystem, state: &mut SimulationState) {
        let mut rng = RngManager::new(3);
        let ctx = SystemContext {
            tick: 1,
            reserve_name: "Test",
        };
        system
            .run(&ctx, state, &mut rng.stream("reproduction"))
            .unwrap();
    }

    #[test]
    fn births_land_in_their_spawn_boxes() {
        let mut state = SimulationState::new();
        state.spawn(AgentKind::Prey, Position::new(450.0, 450.0));
        state.spawn(AgentKind::Predator, Position::new(-450.0, -450.0));
        let mut system = ReproductionSystem::new(&certain_births());

        run_once(&mut system, &mut state);

        assert_eq!(state.counts().prey_count, 2);
        assert_eq!(state.counts().predator_count, 2);
        let newborn_prey = state.prey().last().unwrap();
        assert!(newborn_prey.position.x.abs() <= 100.0 && newborn_prey.position.y.abs() <= 100.0);
        let newborn_predator = state.predators().last().unwrap();
        assert!(
            newborn_predator.position.x.abs() <= 400.0
                && newborn_predator.position.y.abs() <= 400.0
        );
    }

    #[test]
    fn no_birth_at_or_above_caps() {
        let mut state = SimulationState::new();
        for _ in 0..30 {
            state.spawn(AgentKind::Prey, Position::default());
        }
        for _ in 0..10 {
            state.spawn(AgentKind::Predator, Position::default());
        }
        let mut system = ReproductionSystem::new(&certain_births());
        run_once(&mut system, &mut state);
        assert_eq!(state.prey_count(), 30);
        assert_eq!(state.predator_count(), 10);
    }

    #[test]
    fn extinct_populations_stay_extinct() {
        let mut state = SimulationState::new();
        let mut system = ReproductionSystem::new(&certain_births());
        run_once(&mut system, &mut state);
        assert_eq!(state.counts(), Default::default());
    }
}
