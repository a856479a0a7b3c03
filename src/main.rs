use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ecobalance::{
    config::AppConfig,
    driver::{DriverSettings, SimulationHandle},
    engine::{EngineBuilder, EngineSettings},
    insights::InsightReport,
    population::{ModelParams, PopulationModel, SeriesReport},
    provider::CsvGridProvider,
    reserve::{ReserveCatalog, ReserveLoader},
    rng::RngManager,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Predator-prey simulation for tiger reserves")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config/ecobalance.yaml")]
    config: PathBuf,

    /// Seed every random stream (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the reserves in the catalogue
    Reserves,
    /// Integrate the population model for a reserve
    Series {
        reserve: String,
        #[arg(long, value_enum, default_value_t = SeriesFormat::Json)]
        format: SeriesFormat,
    },
    /// Print insights and recommendations for a reserve
    Insights { reserve: String },
    /// Run the spatial agent simulation and print counts per tick
    Simulate {
        /// Defaults to the configured reserve
        reserve: Option<String>,
        #[arg(long, default_value_t = 30)]
        ticks: u64,
        /// Override the tick period in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,
    },
    /// Serve the reserve API and live count stream over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeriesFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_or_default(&cli.config)?;
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    init_tracing(&config.logging.level);

    let catalog = ReserveLoader::new(".").load(&config.reserves_path)?;

    match cli.command {
        Command::Reserves => list_reserves(&catalog),
        Command::Series { reserve, format } => print_series(&catalog, &config, &reserve, format),
        Command::Insights { reserve } => {
            let report = InsightReport::for_reserve(catalog.find(&reserve)?);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Simulate {
            reserve,
            ticks,
            period_ms,
        } => {
            let name = reserve.unwrap_or_else(|| config.default_reserve.clone());
            if let Some(period_ms) = period_ms {
                config.set_tick_period_ms(period_ms)?;
            }
            simulate(&catalog, &config, &name, ticks).await
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            web::run(WebServerConfig { catalog, config }).await
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list_reserves(catalog: &ReserveCatalog) -> Result<()> {
    for reserve in &catalog.reserves {
        let density = reserve
            .tiger_density
            .map(|td| format!("{td:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<28} {:<28} {:>8.0} sq km  density {}",
            reserve.name, reserve.region, reserve.total_area, density
        );
    }
    Ok(())
}

fn print_series(
    catalog: &ReserveCatalog,
    config: &AppConfig,
    name: &str,
    format: SeriesFormat,
) -> Result<()> {
    let reserve = catalog.find(name)?;
    let model = PopulationModel::new(ModelParams::default(), config.model_settings());
    let mut rng = RngManager::with_seed(config.seed);
    let report = SeriesReport::generate(&model, reserve, &mut rng.stream("population"));
    match format {
        SeriesFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        SeriesFormat::Csv => print!("{}", report.to_csv()),
    }
    Ok(())
}

async fn simulate(
    catalog: &ReserveCatalog,
    config: &AppConfig,
    name: &str,
    ticks: u64,
) -> Result<()> {
    let reserve = catalog.find(name)?.clone();
    let engine = EngineBuilder::new(EngineSettings {
        reserve_name: reserve.name.clone(),
        seed: config.seed,
    })
    .with_default_systems(&config.rules)
    .build();

    let provider = Arc::new(CsvGridProvider::new(&config.grid_dir));
    let mut handle = SimulationHandle::spawn(
        provider,
        reserve,
        engine,
        DriverSettings {
            tick_period: config.tick_period(),
            max_ticks: Some(ticks),
        },
    );

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            println!(
                "tick {:>4}  predators {:>4}  prey {:>4}",
                update.tick, update.counts.predator_count, update.counts.prey_count
            );
        }
    });

    let ran = tokio::select! {
        ran = handle.join() => ran?,
        _ = tokio::signal::ctrl_c() => {
            println!("interrupted");
            return Ok(());
        }
    };
    printer.await.context("count printer panicked")?;
    println!("'{}' finished after {} ticks", name, ran);
    Ok(())
}
