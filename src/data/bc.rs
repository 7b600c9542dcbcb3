//! Boundary condition helpers for the physical edges of the global domain.
//!
//! The Dirichlet boundary sits at global indices `0` and `n + 1`, which are
//! exactly the ghost rows/columns of the workers that own a physical edge.
//! Edge ownership is exclusive, so each boundary cell (corners included) is
//! written by one worker only.

use crate::data::local_grid::{Field, LocalGrid};
use crate::topology::{Direction, EdgeSet};

/// Set the ghost strip on every side in `edges` of `field` to `value`.
pub fn apply_dirichlet_to_field(field: &mut Field, edges: EdgeSet, value: f64) {
    for dir in edges.iter() {
        field.fill_ghost_edge(dir, value);
    }
}

/// Apply a constant Dirichlet value to `previous` and `current` on every
/// physical edge owned by this worker.
pub fn apply_dirichlet_with(grid: &mut LocalGrid, value: f64) {
    let edges = grid.region().edges;
    if edges.is_empty() {
        return;
    }
    let (previous, current, _) = grid.levels_mut();
    apply_dirichlet_to_field(previous, edges, value);
    apply_dirichlet_to_field(current, edges, value);
}

/// Homogeneous Dirichlet condition: zero on every owned physical edge.
/// Idempotent; zero is a fixed point.
pub fn apply_dirichlet(grid: &mut LocalGrid) {
    apply_dirichlet_with(grid, 0.0);
}

/// Whether `field` holds `value` on every ghost cell of side `dir`.
pub fn edge_holds(field: &Field, dir: Direction, value: f64) -> bool {
    let (rows, cols) = field.shape();
    match dir {
        Direction::West => field.row(0).iter().all(|&v| v == value),
        Direction::East => field.row(rows - 1).iter().all(|&v| v == value),
        Direction::South => (0..rows).all(|i| field.get(i, 0) == value),
        Direction::North => (0..rows).all(|i| field.get(i, cols - 1) == value),
    }
}
