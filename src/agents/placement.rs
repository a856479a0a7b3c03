use rand::Rng;

use super::{Position, WORLD_HALF_EXTENT};
use crate::grid::DensityGrid;

pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;
/// Past this many attempts the drawn cell is accepted regardless of density.
pub const FORCED_AFTER_ATTEMPTS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    pub row: usize,
    pub col: usize,
    pub attempts: u32,
    /// Accepted through the attempt cap rather than a density draw.
    pub forced: bool,
}

/// Rejection-samples a cell weighted by grid density and maps it to a point
/// inside that cell's tile.
pub fn place_on_grid<R: Rng + ?Sized>(grid: &DensityGrid, rng: &mut R) -> Placement {
    let rows = grid.row_count();
    let cols = grid.col_count();
    let tile_size = 2.0 * WORLD_HALF_EXTENT / rows.max(1) as f64;

    let mut attempts = 0;
    let (row, col, forced) = loop {
        attempts += 1;
        let row = if rows > 0 { rng.gen_range(0..rows) } else { 0 };
        let col = if cols > 0 { rng.gen_range(0..cols) } else { 0 };
        let density = grid.value(row, col);
        if rng.gen::<f64>() < density {
            break (row, col, false);
        }
        if attempts > FORCED_AFTER_ATTEMPTS || attempts >= MAX_PLACEMENT_ATTEMPTS {
            break (row, col, true);
        }
    };

    let x = -WORLD_HALF_EXTENT + tile_size * (row as f64 + rng.gen::<f64>());
    let y = -WORLD_HALF_EXTENT + tile_size * (col as f64 + rng.gen::<f64>());
    Placement {
        position: Position::new(x, y).clamped(),
        row,
        col,
        attempts,
        forced,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn full_density_accepts_first_attempt() {
        let grid = DensityGrid::filled(10, 10, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..500 {
            let placement = place_on_grid(&grid, &mut rng);
            assert_eq!(placement.attempts, 1);
            assert!(!placement.forced);
        }
    }

    #[test]
    fn zero_density_falls_back_after_ninety_attempts() {
        let grid = DensityGrid::filled(4, 4, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let placement = place_on_grid(&grid, &mut rng);
        assert_eq!(placement.attempts, FORCED_AFTER_ATTEMPTS + 1);
        assert!(placement.forced);
        assert!(placement.position.in_bounds());
    }

    #[test]
    fn empty_grid_places_in_first_tile_without_dividing_by_zero() {
        let grid = DensityGrid::empty();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let placement = place_on_grid(&grid, &mut rng);
        assert!(placement.forced);
        assert_eq!((placement.row, placement.col), (0, 0));
        assert!(placement.position.in_bounds());
    }

    #[test]
    fn position_lands_inside_accepted_tile() {
        let mut rows = vec![vec![0.0; 5]; 5];
        rows[3][1] = 1.0;
        let grid = DensityGrid::new(rows);
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        for _ in 0..50 {
            let placement = place_on_grid(&grid, &mut rng);
            if placement.forced {
                continue;
            }
            assert_eq!((placement.row, placement.col), (3, 1));
            assert!((100.0..=300.0).contains(&placement.position.x));
            assert!((-300.0..=-100.0).contains(&placement.position.y));
        }
    }
}
