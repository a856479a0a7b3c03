use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    agents::AgentSnapshot,
    config::AppConfig,
    driver::{DriverSettings, SimulationHandle, TickUpdate},
    engine::{EngineBuilder, EngineSettings},
    insights::InsightReport,
    population::{PopulationModel, SeriesReport},
    provider::CsvGridProvider,
    reserve::{CatalogError, ReserveCatalog, ReserveView},
    rng::RngManager,
};

#[derive(Clone, Serialize)]
pub struct CountsFrame {
    pub reserve: String,
    #[serde(flatten)]
    pub update: TickUpdate,
}

#[derive(Serialize)]
pub struct SimulationStatus {
    pub reserve: Option<String>,
    pub running: bool,
    pub snapshot: Option<AgentSnapshot>,
}

struct ActiveSimulation {
    handle: SimulationHandle,
    forwarder: JoinHandle<()>,
}

struct AppState {
    catalog: ReserveCatalog,
    config: AppConfig,
    provider: Arc<CsvGridProvider>,
    broadcaster: broadcast::Sender<String>,
    active: Mutex<Option<ActiveSimulation>>,
}

pub struct WebServerConfig {
    pub catalog: ReserveCatalog,
    pub config: AppConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    NotFound(#[from] CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn app_state(catalog: ReserveCatalog, config: AppConfig) -> Arc<AppState> {
    let (tx, _) = broadcast::channel::<String>(512);
    Arc::new(AppState {
        provider: Arc::new(CsvGridProvider::new(&config.grid_dir)),
        catalog,
        config,
        broadcaster: tx,
        active: Mutex::new(None),
    })
}

pub fn router(catalog: ReserveCatalog, config: AppConfig) -> Router {
    Router::new()
        .route("/api/reserves", get(list_reserves))
        .route("/api/reserves/:name", get(reserve_detail))
        .route("/api/reserves/:name/series", get(reserve_series))
        .route("/api/reserves/:name/insights", get(reserve_insights))
        .route(
            "/api/simulation",
            get(simulation_status).delete(stop_simulation),
        )
        .route("/api/simulation/:name", post(select_reserve))
        .route("/api/events", get(stream_events))
        .with_state(app_state(catalog, config))
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig { catalog, config } = config;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let router = router(catalog, config);
    info!(%addr, "reserve simulation API listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}

async fn list_reserves(State(state): State<Arc<AppState>>) -> Json<Vec<ReserveView>> {
    Json(state.catalog.reserves.iter().map(ReserveView::from).collect())
}

async fn reserve_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ReserveView>, ApiError> {
    Ok(Json(ReserveView::from(state.catalog.find(&name)?)))
}

async fn reserve_series(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<SeriesReport>, ApiError> {
    let reserve = state.catalog.find(&name)?;
    let model = PopulationModel::new(Default::default(), state.config.model_settings());
    let mut rng = RngManager::with_seed(state.config.seed);
    let report = SeriesReport::generate(&model, reserve, &mut rng.stream("population"));
    Ok(Json(report))
}

async fn reserve_insights(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<InsightReport>, ApiError> {
    let reserve = state.catalog.find(&name)?;
    Ok(Json(InsightReport::for_reserve(reserve)))
}

async fn select_reserve(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<SimulationStatus>, ApiError> {
    let reserve = state.catalog.find(&name)?.clone();
    let mut active = state.active.lock().await;
    if let Some(previous) = active.take() {
        dispose(previous).await;
    }

    let engine = EngineBuilder::new(EngineSettings {
        reserve_name: reserve.name.clone(),
        seed: state.config.seed,
    })
    .with_default_systems(&state.config.rules)
    .build();
    let mut handle = SimulationHandle::spawn(
        state.provider.clone(),
        reserve.clone(),
        engine,
        DriverSettings {
            tick_period: state.config.tick_period(),
            max_ticks: None,
        },
    );

    let mut updates = handle.subscribe();
    let tx = state.broadcaster.clone();
    let label = reserve.name.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let frame = CountsFrame {
                        reserve: label.clone(),
                        update,
                    };
                    if let Ok(payload) = serde_json::to_string(&frame) {
                        let _ = tx.send(payload);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event forwarder lagged behind the simulation");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!(reserve = %reserve.name, "reserve selected");
    *active = Some(ActiveSimulation { handle, forwarder });

    Ok(Json(SimulationStatus {
        reserve: Some(reserve.name),
        running: true,
        snapshot: None,
    }))
}

async fn simulation_status(State(state): State<Arc<AppState>>) -> Json<SimulationStatus> {
    let active = state.active.lock().await;
    Json(match active.as_ref() {
        Some(sim) => SimulationStatus {
            reserve: Some(sim.handle.reserve().to_string()),
            running: !sim.handle.is_finished(),
            snapshot: sim.handle.snapshot(),
        },
        None => SimulationStatus {
            reserve: None,
            running: false,
            snapshot: None,
        },
    })
}

async fn stop_simulation(State(state): State<Arc<AppState>>) -> StatusCode {
    let mut active = state.active.lock().await;
    match active.take() {
        Some(previous) => {
            dispose(previous).await;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn dispose(sim: ActiveSimulation) {
    let ActiveSimulation { handle, forwarder } = sim;
    forwarder.abort();
    if let Err(err) = handle.dispose().await {
        warn!(error = %err, "simulation ended with an error");
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TickCounts;

    const CATALOGUE: &str = r#"
reserves:
  - id: 3
    name: Kabini
    region: Karnataka
    total_area: 2585
    core_area: 800
    buffer_area: 300
    tiger_density: 38
    lat_min: 11
    lat_max: 13
    lon_min: 76
    lon_max: 77
"#;

    fn state() -> Arc<AppState> {
        let catalog = ReserveCatalog::from_yaml_str(CATALOGUE).unwrap();
        app_state(catalog, AppConfig::default())
    }

    #[tokio::test]
    async fn reserve_detail_includes_map_geometry() {
        let Json(view) = reserve_detail(State(state()), Path("kabini".into()))
            .await
            .expect("known reserve");
        assert_eq!(view.center, (12.0, 76.5));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["name"], "Kabini");
        assert_eq!(json["outline"][0], serde_json::json!([11.0, 76.0]));
        assert_eq!(json["outline"][2], serde_json::json!([13.0, 77.0]));
    }

    #[tokio::test]
    async fn unknown_reserve_is_not_found() {
        match reserve_detail(State(state()), Path("Kanha".into())).await {
            Ok(_) => panic!("Kanha is not in the catalogue"),
            Err(err) => assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND),
        }
    }

    #[tokio::test]
    async fn insights_include_display_rows() {
        let Json(report) = reserve_insights(State(state()), Path("Kabini".into()))
            .await
            .expect("known reserve");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["display"][0]["title"], "NDVI Distribution");
        assert_eq!(json["display"][0]["high"], "76.0%");
        assert_eq!(json["display"][1]["high"], "40.0");
    }

    #[test]
    fn counts_frame_carries_its_own_tick() {
        let frame = CountsFrame {
            reserve: "Kabini".into(),
            update: TickUpdate {
                tick: 7,
                counts: TickCounts {
                    predator_count: 4,
                    prey_count: 31,
                },
            },
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "reserve": "Kabini",
                "tick": 7,
                "predatorCount": 4,
                "preyCount": 31,
            })
        );
    }
}
