mod movement;
mod pursuit;
mod reproduction;
mod starvation;

pub use movement::PreyMovementSystem;
pub use pursuit::PredatorPursuitSystem;
pub use reproduction::ReproductionSystem;
pub use starvation::StarvationSystem;

use serde::{Deserialize, Serialize};

fn default_prey_step() -> f64 {
    25.0
}

fn default_predator_step() -> f64 {
    25.0
}

fn default_capture_radius() -> f64 {
    20.0
}

fn default_prey_birth_below() -> usize {
    30
}

fn default_prey_birth_chance() -> f64 {
    0.3
}

fn default_prey_birth_extent() -> f64 {
    100.0
}

fn default_predator_birth_below() -> usize {
    10
}

fn default_predator_birth_chance() -> f64 {
    0.05
}

fn default_predator_birth_extent() -> f64 {
    400.0
}

fn default_starvation_prey_below() -> usize {
    6
}

fn default_starvation_predators_above() -> usize {
    2
}

fn default_starvation_chance() -> f64 {
    0.05
}

/// Per-tick behaviour constants. Birth and starvation chances are flat per
/// tick, not scaled by population size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Largest prey displacement per axis per tick.
    #[serde(default = "default_prey_step")]
    pub prey_step: f64,
    #[serde(default = "default_predator_step")]
    pub predator_step: f64,
    #[serde(default = "default_capture_radius")]
    pub capture_radius: f64,
    #[serde(default = "default_prey_birth_below")]
    pub prey_birth_below: usize,
    #[serde(default = "default_prey_birth_chance")]
    pub prey_birth_chance: f64,
    /// Newborn prey appear in `[-extent, extent]` on both axes.
    #[serde(default = "default_prey_birth_extent")]
    pub prey_birth_extent: f64,
    #[serde(default = "default_predator_birth_below")]
    pub predator_birth_below: usize,
    #[serde(default = "default_predator_birth_chance")]
    pub predator_birth_chance: f64,
    #[serde(default = "default_predator_birth_extent")]
    pub predator_birth_extent: f64,
    #[serde(default = "default_starvation_prey_below")]
    pub starvation_prey_below: usize,
    #[serde(default = "default_starvation_predators_above")]
    pub starvation_predators_above: usize,
    #[serde(default = "default_starvation_chance")]
    pub starvation_chance: f64,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            prey_step: default_prey_step(),
            predator_step: default_predator_step(),
            capture_radius: default_capture_radius(),
            prey_birth_below: default_prey_birth_below(),
            prey_birth_chance: default_prey_birth_chance(),
            prey_birth_extent: default_prey_birth_extent(),
            predator_birth_below: default_predator_birth_below(),
            predator_birth_chance: default_predator_birth_chance(),
            predator_birth_extent: default_predator_birth_extent(),
            starvation_prey_below: default_starvation_prey_below(),
            starvation_predators_above: default_starvation_predators_above(),
            starvation_chance: default_starvation_chance(),
        }
    }
}
