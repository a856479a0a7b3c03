pub mod agents;
pub mod config;
pub mod driver;
pub mod engine;
pub mod grid;
pub mod insights;
pub mod population;
pub mod provider;
pub mod reserve;
pub mod rng;
pub mod systems;
pub mod web;

pub use config::AppConfig;
pub use driver::{DriverSettings, SimulationHandle};
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use reserve::{Reserve, ReserveCatalog};
