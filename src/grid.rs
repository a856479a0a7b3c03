//! Density grids and their per-grid resolution status.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Ndvi,
    Prey,
    Predator,
}

impl GridKind {
    pub const ALL: [GridKind; 3] = [GridKind::Ndvi, GridKind::Prey, GridKind::Predator];

    /// Resource name for a reserve, e.g. `Bandipur_last_prey_density.csv`.
    pub fn resource_name(self, reserve: &str) -> String {
        match self {
            GridKind::Ndvi => format!("{reserve}_last_ndvi.csv"),
            GridKind::Prey => format!("{reserve}_last_prey_density.csv"),
            GridKind::Predator => format!("{reserve}_last_predator_density.csv"),
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridKind::Ndvi => write!(f, "ndvi"),
            GridKind::Prey => write!(f, "prey"),
            GridKind::Predator => write!(f, "predator"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("failed to read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: '{value}' is not a number")]
    Parse { line: usize, value: String },
    #[error("line {line} has {found} columns, expected {expected}")]
    Ragged {
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("no {kind} grid available for '{reserve}'")]
    Missing { reserve: String, kind: GridKind },
}

/// Rectangular row-major grid with every value in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityGrid {
    rows: Vec<Vec<f64>>,
}

impl DensityGrid {
    /// Builds a grid, clamping values into [0, 1]. Non-finite values become 0.
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(clamp_unit).collect())
            .collect();
        Self { rows }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self::new(vec![vec![value; cols]; rows])
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse_csv(text: &str) -> Result<Self, GridError> {
        let mut rows = Vec::new();
        let mut expected = None;
        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row = trimmed
                .split(',')
                .map(|cell| {
                    let cell = cell.trim();
                    cell.parse::<f64>().map_err(|_| GridError::Parse {
                        line: index + 1,
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, GridError>>()?;
            match expected {
                None => expected = Some(row.len()),
                Some(width) if width != row.len() => {
                    return Err(GridError::Ragged {
                        line: index + 1,
                        found: row.len(),
                        expected: width,
                    });
                }
                Some(_) => {}
            }
            rows.push(row);
        }
        Ok(Self::new(rows))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the first row; 0 for an empty grid.
    pub fn col_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.col_count() == 0
    }

    /// Cell value, 0 outside the grid.
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn mean(&self) -> f64 {
        let count: usize = self.rows.iter().map(Vec::len).sum();
        if count == 0 {
            return 0.0;
        }
        self.rows.iter().flatten().sum::<f64>() / count as f64
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GridStatus {
    Pending,
    Resolved,
    Defaulted { reason: String },
}

impl GridStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, GridStatus::Pending)
    }
}

/// One grid slot: its status and, once settled, its data.
#[derive(Debug, Clone)]
pub struct GridSlot {
    pub status: GridStatus,
    pub grid: DensityGrid,
}

impl GridSlot {
    pub fn pending() -> Self {
        Self {
            status: GridStatus::Pending,
            grid: DensityGrid::empty(),
        }
    }

    pub fn resolved(grid: DensityGrid) -> Self {
        Self {
            status: GridStatus::Resolved,
            grid,
        }
    }

    pub fn defaulted(reason: impl Into<String>) -> Self {
        Self {
            status: GridStatus::Defaulted {
                reason: reason.into(),
            },
            grid: DensityGrid::empty(),
        }
    }
}

/// The three grids of one reserve selection.
#[derive(Debug, Clone)]
pub struct GridSet {
    pub ndvi: GridSlot,
    pub prey: GridSlot,
    pub predator: GridSlot,
}

impl Default for GridSet {
    fn default() -> Self {
        Self {
            ndvi: GridSlot::pending(),
            prey: GridSlot::pending(),
            predator: GridSlot::pending(),
        }
    }
}

impl GridSet {
    pub fn resolved(ndvi: DensityGrid, prey: DensityGrid, predator: DensityGrid) -> Self {
        Self {
            ndvi: GridSlot::resolved(ndvi),
            prey: GridSlot::resolved(prey),
            predator: GridSlot::resolved(predator),
        }
    }

    pub fn slot(&self, kind: GridKind) -> &GridSlot {
        match kind {
            GridKind::Ndvi => &self.ndvi,
            GridKind::Prey => &self.prey,
            GridKind::Predator => &self.predator,
        }
    }

    pub fn slot_mut(&mut self, kind: GridKind) -> &mut GridSlot {
        match kind {
            GridKind::Ndvi => &mut self.ndvi,
            GridKind::Prey => &mut self.prey,
            GridKind::Predator => &mut self.predator,
        }
    }

    pub fn grid(&self, kind: GridKind) -> &DensityGrid {
        &self.slot(kind).grid
    }

    /// True once every grid is resolved or defaulted.
    pub fn is_settled(&self) -> bool {
        GridKind::ALL
            .iter()
            .all(|kind| self.slot(*kind).status.is_settled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_clamps() {
        let grid = DensityGrid::parse_csv("0.1,0.2,1.5\n\n0.4, -0.2 ,0.6\n").expect("parses");
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.col_count(), 3);
        assert_eq!(grid.value(0, 2), 1.0);
        assert_eq!(grid.value(1, 1), 0.0);
        assert_eq!(grid.value(5, 5), 0.0);
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let err = DensityGrid::parse_csv("0.1,abc\n").unwrap_err();
        assert!(matches!(err, GridError::Parse { line: 1, .. }));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = DensityGrid::parse_csv("0.1,0.2\n0.3\n").unwrap_err();
        assert!(matches!(
            err,
            GridError::Ragged {
                line: 2,
                found: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn resource_names_follow_reserve() {
        assert_eq!(
            GridKind::Predator.resource_name("Nagarhole"),
            "Nagarhole_last_predator_density.csv"
        );
    }

    #[test]
    fn grid_set_settles_once_no_slot_is_pending() {
        let mut set = GridSet::default();
        assert!(!set.is_settled());
        *set.slot_mut(GridKind::Ndvi) = GridSlot::resolved(DensityGrid::filled(2, 2, 0.5));
        *set.slot_mut(GridKind::Prey) = GridSlot::defaulted("missing");
        assert!(!set.is_settled());
        *set.slot_mut(GridKind::Predator) = GridSlot::resolved(DensityGrid::empty());
        assert!(set.is_settled());
        assert!((set.grid(GridKind::Ndvi).mean() - 0.5).abs() < 1e-12);
    }
}
