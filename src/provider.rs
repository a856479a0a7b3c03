use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::grid::{DensityGrid, GridError, GridKind, GridSet, GridSlot};

/// Source of the three density grids of a reserve.
///
/// Implementations may fail per grid; [`load_grids`] isolates those failures
/// so callers always get a settled [`GridSet`].
pub trait DensityGridProvider: Send + Sync {
    fn load_grid(
        &self,
        reserve: &str,
        kind: GridKind,
    ) -> impl Future<Output = Result<DensityGrid, GridError>> + Send;
}

/// Reads `<dir>/<reserve>_last_*.csv` files.
#[derive(Debug, Clone)]
pub struct CsvGridProvider {
    dir: PathBuf,
}

impl CsvGridProvider {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl DensityGridProvider for CsvGridProvider {
    fn load_grid(
        &self,
        reserve: &str,
        kind: GridKind,
    ) -> impl Future<Output = Result<DensityGrid, GridError>> + Send {
        let path = self.dir.join(kind.resource_name(reserve));
        async move {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| GridError::Io {
                    resource: path.display().to_string(),
                    source,
                })?;
            DensityGrid::parse_csv(&text)
        }
    }
}

/// In-memory grids, keyed by reserve and kind.
#[derive(Debug, Clone, Default)]
pub struct StaticGridProvider {
    grids: HashMap<(String, GridKind), DensityGrid>,
}

impl StaticGridProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, reserve: &str, kind: GridKind, grid: DensityGrid) -> Self {
        self.grids.insert((reserve.to_string(), kind), grid);
        self
    }
}

impl DensityGridProvider for StaticGridProvider {
    fn load_grid(
        &self,
        reserve: &str,
        kind: GridKind,
    ) -> impl Future<Output = Result<DensityGrid, GridError>> + Send {
        let found = self
            .grids
            .get(&(reserve.to_string(), kind))
            .cloned()
            .ok_or_else(|| GridError::Missing {
                reserve: reserve.to_string(),
                kind,
            });
        async move { found }
    }
}

/// Resolves all three grids concurrently. Never fails: a grid that cannot be
/// loaded is logged and replaced by an empty one.
pub async fn load_grids<P: DensityGridProvider + ?Sized>(provider: &P, reserve: &str) -> GridSet {
    let (ndvi, prey, predator) = tokio::join!(
        provider.load_grid(reserve, GridKind::Ndvi),
        provider.load_grid(reserve, GridKind::Prey),
        provider.load_grid(reserve, GridKind::Predator),
    );
    GridSet {
        ndvi: settle(reserve, GridKind::Ndvi, ndvi),
        prey: settle(reserve, GridKind::Prey, prey),
        predator: settle(reserve, GridKind::Predator, predator),
    }
}

fn settle(reserve: &str, kind: GridKind, result: Result<DensityGrid, GridError>) -> GridSlot {
    match result {
        Ok(grid) => {
            debug!(
                reserve,
                %kind,
                rows = grid.row_count(),
                cols = grid.col_count(),
                "density grid resolved"
            );
            GridSlot::resolved(grid)
        }
        Err(err) => {
            warn!(reserve, %kind, error = %err, "density grid unavailable, using empty grid");
            GridSlot::defaulted(err.to_string())
        }
    }
}
