use anyhow::Result;

use crate::{
    agents::{AgentId, AgentKind, Position, SimulationState},
    engine::{System, SystemContext},
    rng::SystemRng,
};

use super::RuleSettings;

/// Each predator closes on the nearest prey and eats it once within the
/// capture radius. One capture per predator per tick.
pub struct PredatorPursuitSystem {
    step: f64,
    capture_radius: f64,
}

impl PredatorPursuitSystem {
    pub fn new(rules: &RuleSettings) -> Self {
        Self {
            step: rules.predator_step,
            capture_radius: rules.capture_radius,
        }
    }
}

impl Default for PredatorPursuitSystem {
    fn default() -> Self {
        Self::new(&RuleSettings::default())
    }
}

/// Nearest prey by Euclidean distance; the earlier prey wins a tie.
fn nearest_prey(state: &SimulationState, from: Position) -> Option<(AgentId, Position, f64)> {
    let mut best: Option<(AgentId, Position, f64)> = None;
    for prey in state.prey() {
        let distance = from.distance_to(prey.position);
        match best {
            Some((_, _, closest)) if distance >= closest => {}
            _ => best = Some((prey.id, prey.position, distance)),
        }
    }
    best
}

impl System for PredatorPursuitSystem {
    fn name(&self) -> &str {
        "predator_pursuit"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        state: &mut SimulationState,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for predator_id in state.ids(AgentKind::Predator) {
            let Some(from) = state
                .agent(AgentKind::Predator, predator_id)
                .map(|agent| agent.position)
            else {
                continue;
            };

            let Some((prey_id, prey_position, distance)) = nearest_prey(state, from) else {
                if let Some(predator) = state.agent_mut(AgentKind::Predator, predator_id) {
                    predator.hold();
                }
                continue;
            };

            // Full step along the unit vector; a close prey can be overshot.
            let target = if distance > 0.0 {
                Position::new(
                    from.x + (prey_position.x - from.x) / distance * self.step,
                    from.y + (prey_position.y - from.y) / distance * self.step,
                )
            } else {
                from
            };

            let landed = match state.agent_mut(AgentKind::Predator, predator_id) {
                Some(predator) => {
                    predator.move_to(target);
                    predator.position
                }
                None => continue,
            };

            if landed.distance_to(prey_position) < self.capture_radius {
                state.remove(AgentKind::Prey, prey_id);
            }
        }
        Ok(())
    }
}
