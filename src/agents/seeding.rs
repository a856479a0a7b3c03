use rand::Rng;
use serde::Serialize;
use tracing::info;

use super::{place_on_grid, AgentKind, SimulationState};
use crate::engine::EngineError;
use crate::grid::{GridKind, GridSet};

/// How many agents of each kind to seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulationPlan {
    pub predators: usize,
    pub prey: usize,
    /// False when counts were drawn because the reserve reports no density.
    pub density_derived: bool,
}

impl PopulationPlan {
    pub fn from_tiger_density<R: Rng + ?Sized>(tiger_density: Option<f64>, rng: &mut R) -> Self {
        match tiger_density {
            Some(density) if density.is_finite() => {
                let predators = ((density * 0.5).round().max(0.0) as usize).max(2);
                let prey = ((predators as f64 * 8.0).round() as usize).max(10);
                Self {
                    predators,
                    prey,
                    density_derived: true,
                }
            }
            _ => Self {
                predators: rng.gen_range(8..=10),
                prey: rng.gen_range(45..=50),
                density_derived: false,
            },
        }
    }
}

/// Places every planned agent on its density grid. Refuses to run while any
/// grid is still pending.
pub fn seed_state<R: Rng + ?Sized>(
    reserve_name: &str,
    plan: PopulationPlan,
    grids: &GridSet,
    rng: &mut R,
) -> Result<SimulationState, EngineError> {
    if !grids.is_settled() {
        return Err(EngineError::GridsPending(reserve_name.to_string()));
    }

    let mut state = SimulationState::new();
    let mut forced = 0usize;
    for (kind, count, grid) in [
        (AgentKind::Predator, plan.predators, grids.grid(GridKind::Predator)),
        (AgentKind::Prey, plan.prey, grids.grid(GridKind::Prey)),
    ] {
        for _ in 0..count {
            let placement = place_on_grid(grid, rng);
            if placement.forced {
                forced += 1;
            }
            state.spawn(kind, placement.position);
        }
    }

    info!(
        reserve = reserve_name,
        predators = plan.predators,
        prey = plan.prey,
        density_derived = plan.density_derived,
        forced_placements = forced,
        "seeded agents"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::grid::{DensityGrid, GridSlot};

    #[test]
    fn counts_follow_tiger_density() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let plan = PopulationPlan::from_tiger_density(Some(38.0), &mut rng);
        assert_eq!(plan.predators, 19);
        assert_eq!(plan.prey, 152);
        assert!(plan.density_derived);
    }

    #[test]
    fn low_density_hits_floors() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let plan = PopulationPlan::from_tiger_density(Some(1.0), &mut rng);
        assert_eq!(plan.predators, 2);
        assert_eq!(plan.prey, 16);
        let plan = PopulationPlan::from_tiger_density(Some(0.0), &mut rng);
        assert_eq!((plan.predators, plan.prey), (2, 16));
    }

    #[test]
    fn missing_density_draws_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..200 {
            let plan = PopulationPlan::from_tiger_density(None, &mut rng);
            assert!((8..=10).contains(&plan.predators));
            assert!((45..=50).contains(&plan.prey));
            assert!(!plan.density_derived);
        }
    }

    #[test]
    fn seeding_waits_for_every_grid() {
        let mut grids = GridSet::default();
        grids.ndvi = GridSlot::resolved(DensityGrid::filled(2, 2, 1.0));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = PopulationPlan::from_tiger_density(Some(10.0), &mut rng);
        let err = seed_state("Kabini", plan, &grids, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::GridsPending(_)));
    }

    #[test]
    fn seeding_with_defaulted_grids_still_places_everyone() {
        let grids = GridSet {
            ndvi: GridSlot::defaulted("io"),
            prey: GridSlot::defaulted("io"),
            predator: GridSlot::defaulted("io"),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let plan = PopulationPlan::from_tiger_density(Some(10.0), &mut rng);
        let state = seed_state("Kabini", plan, &grids, &mut rng).expect("seeds");
        assert_eq!(state.predator_count(), 5);
        assert_eq!(state.prey_count(), 40);
        assert!(state.predators().chain(state.prey()).all(|a| a.position.in_bounds()));
    }
}
