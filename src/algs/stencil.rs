//! Leapfrog update of the 2D scalar wave equation with a 5-point Laplacian.
//!
//! ```text
//! next = 2 cur - prev + cx (cur[i+1][j] - 2 cur + cur[i-1][j])
//!                     + cy (cur[i][j+1] - 2 cur + cur[i][j-1])
//! cx = (c dt / dx)^2,  cy = (c dt / dy)^2
//! ```
//!
//! Only interior cells are written; ghosts of `current` are read and must be
//! up to date. No clamping: a Courant number above the stability limit is a
//! configuration error and simply grows without bound.

use crate::data::local_grid::{Field, LocalGrid};
use crate::domain::GlobalDomain;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilStepper {
    cx: f64,
    cy: f64,
}

impl StencilStepper {
    pub fn new(domain: &GlobalDomain) -> Self {
        let (c, dt) = (domain.c(), domain.dt());
        let rx = c * dt / domain.dx();
        let ry = c * dt / domain.dy();
        Self {
            cx: rx * rx,
            cy: ry * ry,
        }
    }

    /// Stepper with explicit coefficients `(c dt/dx)^2`, `(c dt/dy)^2`.
    pub fn with_coefficients(cx: f64, cy: f64) -> Self {
        Self { cx, cy }
    }

    pub fn coefficients(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    /// Weighted 5-point Laplacian of row `i`, column `j`, given the row above
    /// (`up`, local row `i - 1`), the row itself and the row below.
    #[inline(always)]
    fn laplacian(&self, up: &[f64], row: &[f64], down: &[f64], j: usize) -> f64 {
        let u = row[j];
        self.cx * (down[j] - 2.0 * u + up[j]) + self.cy * (row[j + 1] - 2.0 * u + row[j - 1])
    }

    /// First step with zero initial velocity:
    /// `current = previous + 1/2 * L(previous)` over the interior.
    pub fn first_step_into(&self, previous: &Field, current: &mut Field) {
        debug_assert_eq!(previous.shape(), current.shape());
        let (nxnom, nynom) = (previous.nxnom(), previous.nynom());
        for i in 1..=nxnom {
            let (up, row, down) = (previous.row(i - 1), previous.row(i), previous.row(i + 1));
            for j in 1..=nynom {
                current[(i, j)] = row[j] + 0.5 * self.laplacian(up, row, down, j);
            }
        }
    }

    /// `next = 2 current - previous + L(current)` over the interior.
    pub fn step_into(&self, previous: &Field, current: &Field, next: &mut Field) {
        debug_assert_eq!(previous.shape(), current.shape());
        debug_assert_eq!(current.shape(), next.shape());
        let (rows, stride) = current.shape();
        let nynom = current.nynom();
        let interior = &mut next.as_mut_slice()[stride..(rows - 1) * stride];

        let update_row = |k: usize, out: &mut [f64]| {
            let i = k + 1;
            let (up, row, down) = (current.row(i - 1), current.row(i), current.row(i + 1));
            let prev = previous.row(i);
            for j in 1..=nynom {
                out[j] = 2.0 * row[j] - prev[j] + self.laplacian(up, row, down, j);
            }
        };

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            interior
                .par_chunks_mut(stride)
                .enumerate()
                .for_each(|(k, out)| update_row(k, out));
        }
        #[cfg(not(feature = "rayon"))]
        for (k, out) in interior.chunks_mut(stride).enumerate() {
            update_row(k, out);
        }
    }

    /// Bootstrap `current` from the initial `previous` (ghosts exchanged).
    pub fn first_step(&self, grid: &mut LocalGrid) {
        let (previous, current, _) = grid.levels_mut();
        self.first_step_into(previous, current);
    }

    /// Compute `next` and rotate the time levels.
    pub fn step(&self, grid: &mut LocalGrid) {
        let (previous, current, next) = grid.levels_mut();
        self.step_into(previous, current, next);
        grid.rotate();
    }
}
