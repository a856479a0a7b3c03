//! Stochastic Lotka-Volterra integrator with a logistic vegetation index.
//!
//! Prey grow logistically against an area-scaled capacity and are eaten by
//! predators; vegetation follows its own logistic curve with a yearly
//! seasonal term and is grazed by prey. The system is stepped with forward
//! Euler, clamped to plausible floors, then perturbed by small multiplicative
//! noise.

use std::f64::consts::PI;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::reserve::Reserve;

/// Months per seasonal cycle.
const SEASON_LENGTH: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub prey_growth_rate: f64,
    pub predation_rate: f64,
    pub predator_death_rate: f64,
    pub predator_growth_rate: f64,
    pub vegetation_growth_rate: f64,
    pub vegetation_capacity: f64,
    pub consumption_rate: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            prey_growth_rate: 0.4,
            predation_rate: 0.008,
            predator_death_rate: 0.2,
            predator_growth_rate: 0.0005,
            vegetation_growth_rate: 0.1,
            vegetation_capacity: 0.8,
            consumption_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Number of monthly steps to integrate.
    pub horizon: u32,
    /// Multiplier on every noise amplitude. Zero makes runs deterministic.
    pub noise_scale: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            horizon: 100,
            noise_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub prey: f64,
    pub predator: f64,
    pub vegetation: f64,
}

impl InitialState {
    pub fn from_reserve(reserve: &Reserve) -> Self {
        let tiger_density = reserve.tiger_density_or_default();
        let mut prey = (reserve.area_factor() * 400.0).clamp(500.0, 5_000.0);
        if reserve.core_area > 1_000.0 {
            prey *= 1.2;
        }
        if reserve.buffer_area > 500.0 {
            prey *= 1.1;
        }
        Self {
            prey,
            predator: (tiger_density * 2.0).clamp(10.0, 100.0),
            vegetation: (tiger_density / 50.0).clamp(0.3, 0.8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationSample {
    pub time: u32,
    pub prey: i64,
    pub predator: i64,
    pub vegetation_index: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PopulationModel {
    pub params: ModelParams,
    pub settings: ModelSettings,
}

impl PopulationModel {
    pub fn new(params: ModelParams, settings: ModelSettings) -> Self {
        Self { params, settings }
    }

    pub fn deterministic() -> Self {
        Self {
            params: ModelParams::default(),
            settings: ModelSettings {
                noise_scale: 0.0,
                ..ModelSettings::default()
            },
        }
    }

    pub fn run<R: Rng + ?Sized>(&self, reserve: &Reserve, rng: &mut R) -> Vec<PopulationSample> {
        self.integrate(InitialState::from_reserve(reserve), reserve.area_factor(), rng)
    }

    pub fn integrate<R: Rng + ?Sized>(
        &self,
        initial: InitialState,
        area_factor: f64,
        rng: &mut R,
    ) -> Vec<PopulationSample> {
        let p = &self.params;
        let noise = self.settings.noise_scale;
        let capacity = (10_000.0 * area_factor).max(1.0);
        let InitialState {
            mut prey,
            mut predator,
            mut vegetation,
        } = initial;

        let mut samples = Vec::with_capacity(self.settings.horizon as usize);
        for t in 0..self.settings.horizon {
            let prey_growth = p.prey_growth_rate * prey * (1.0 - prey / capacity);
            let prey_death = p.predation_rate * prey * predator;
            let predator_growth = p.predator_growth_rate * predator * prey;
            let predator_death = p.predator_death_rate * predator;

            let seasonal = 0.1 * (2.0 * PI * t as f64 / SEASON_LENGTH).sin();
            let vegetation_growth = p.vegetation_growth_rate
                * vegetation
                * (1.0 - vegetation / p.vegetation_capacity)
                + seasonal;
            let vegetation_consumption = p.consumption_rate * vegetation * prey;

            prey += prey_growth - prey_death;
            predator += predator_growth - predator_death;
            vegetation += vegetation_growth - vegetation_consumption;

            prey = prey.max(100.0);
            predator = predator.max(1.0);
            vegetation = vegetation.clamp(0.2, 1.0);

            // Draw all three factors every step so the stream does not depend
            // on the noise scale.
            prey *= 1.0 + (rng.gen::<f64>() - 0.5) * 0.1 * noise;
            predator *= 1.0 + (rng.gen::<f64>() - 0.5) * 0.05 * noise;
            vegetation *= 1.0 + (rng.gen::<f64>() - 0.5) * 0.02 * noise;

            samples.push(PopulationSample {
                time: t,
                prey: prey.round() as i64,
                predator: predator.round() as i64,
                vegetation_index: (vegetation * 100.0).round() / 100.0,
            });
        }
        samples
    }
}

/// A computed series tagged with the reserve it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub reserve: String,
    pub generated_at: DateTime<Utc>,
    pub initial: InitialState,
    pub samples: Vec<PopulationSample>,
}

impl SeriesReport {
    pub fn generate<R: Rng + ?Sized>(
        model: &PopulationModel,
        reserve: &Reserve,
        rng: &mut R,
    ) -> Self {
        Self {
            reserve: reserve.name.clone(),
            generated_at: Utc::now(),
            initial: InitialState::from_reserve(reserve),
            samples: model.run(reserve, rng),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("time,prey,predator,vegetation_index\n");
        for sample in &self.samples {
            let _ = writeln!(
                out,
                "{},{},{},{:.2}",
                sample.time, sample.prey, sample.predator, sample.vegetation_index
            );
        }
        out
    }
}
