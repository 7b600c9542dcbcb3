//! Global, run-wide description of the physical problem.

use crate::decomp_error::DecompError;
use serde::{Deserialize, Serialize};

/// Bound on [`GlobalDomain::stability_number`] for the 5-point leapfrog scheme.
pub const CFL_LIMIT_2D: f64 = 1.0;

/// Physical extent of the rectangle, boundary points included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            x_min: -1.0,
            x_max: 1.0,
            y_min: -1.0,
            y_max: 1.0,
        }
    }
}

impl Extent {
    pub fn is_valid(&self) -> bool {
        self.x_max > self.x_min && self.y_max > self.y_min
    }
}

/// Immutable global grid: `nx * ny` unknowns surrounded by a Dirichlet
/// boundary at global indices `0` and `n + 1` along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalDomain {
    nx: usize,
    ny: usize,
    extent: Extent,
    dx: f64,
    dy: f64,
    dt: f64,
    c: f64,
}

impl GlobalDomain {
    /// Build a domain whose time step is `courant * min(dx, dy) / c`.
    pub fn new(
        nx: usize,
        ny: usize,
        extent: Extent,
        c: f64,
        courant: f64,
    ) -> Result<Self, DecompError> {
        let (dx, dy) = Self::spacing(nx, ny, &extent, c)?;
        if !(courant > 0.0) {
            return Err(DecompError::InvalidConfig(format!(
                "courant factor must be positive, got {courant}"
            )));
        }
        Ok(Self::build(nx, ny, extent, dx, dy, courant * dx.min(dy) / c, c))
    }

    /// Build a domain with an explicit time step.
    pub fn with_dt(
        nx: usize,
        ny: usize,
        extent: Extent,
        c: f64,
        dt: f64,
    ) -> Result<Self, DecompError> {
        let (dx, dy) = Self::spacing(nx, ny, &extent, c)?;
        if !(dt > 0.0) {
            return Err(DecompError::InvalidConfig(format!(
                "time step must be positive, got {dt}"
            )));
        }
        Ok(Self::build(nx, ny, extent, dx, dy, dt, c))
    }

    fn spacing(
        nx: usize,
        ny: usize,
        extent: &Extent,
        c: f64,
    ) -> Result<(f64, f64), DecompError> {
        if nx == 0 || ny == 0 {
            return Err(DecompError::EmptyDomain { nx, ny });
        }
        if !extent.is_valid() {
            return Err(DecompError::InvalidConfig(format!(
                "empty physical extent {extent:?}"
            )));
        }
        if !(c > 0.0) {
            return Err(DecompError::InvalidConfig(format!(
                "wave speed must be positive, got {c}"
            )));
        }
        let dx = (extent.x_max - extent.x_min) / (nx as f64 + 1.0);
        let dy = (extent.y_max - extent.y_min) / (ny as f64 + 1.0);
        Ok((dx, dy))
    }

    fn build(nx: usize, ny: usize, extent: Extent, dx: f64, dy: f64, dt: f64, c: f64) -> Self {
        let domain = Self {
            nx,
            ny,
            extent,
            dx,
            dy,
            dt,
            c,
        };
        if !domain.is_stable() {
            log::warn!(
                "c*dt*sqrt(1/dx^2 + 1/dy^2) = {:.4} exceeds the 2D stability limit {:.1}; \
                 the run will blow up",
                domain.stability_number(),
                CFL_LIMIT_2D
            );
        }
        domain
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Wave speed.
    pub fn c(&self) -> f64 {
        self.c
    }

    /// `c * dt / min(dx, dy)`.
    pub fn courant_number(&self) -> f64 {
        self.c * self.dt / self.dx.min(self.dy)
    }

    /// `c * dt * sqrt(1/dx^2 + 1/dy^2)`; the scheme is stable up to `1`.
    pub fn stability_number(&self) -> f64 {
        self.c * self.dt * (self.dx.powi(-2) + self.dy.powi(-2)).sqrt()
    }

    pub fn is_stable(&self) -> bool {
        self.stability_number() <= CFL_LIMIT_2D
    }

    /// Physical x of global index `i` (1-based interior, 0 and nx+1 boundary).
    #[inline]
    pub fn x(&self, i: usize) -> f64 {
        self.extent.x_min + i as f64 * self.dx
    }

    /// Physical y of global index `j`.
    #[inline]
    pub fn y(&self, j: usize) -> f64 {
        self.extent.y_min + j as f64 * self.dy
    }

    /// Area of one cell, used to turn interior sums into integrals.
    pub fn cell_area(&self) -> f64 {
        self.dx * self.dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static WARNINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    /// Records warnings per thread so parallel tests do not see each other.
    struct WarnCapture;

    impl log::Log for WarnCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                WARNINGS.with(|w| w.borrow_mut().push(record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: WarnCapture = WarnCapture;

    fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        // Only the first call installs the logger; later calls see Err.
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Warn);
        WARNINGS.with(|w| w.borrow_mut().clear());
        let out = f();
        (out, WARNINGS.with(|w| w.take()))
    }

    #[test]
    fn stable_courant_factor_does_not_warn() {
        let (d, warnings) =
            warnings_during(|| GlobalDomain::new(100, 100, Extent::default(), 1.0, 0.5).unwrap());
        assert!(d.is_stable());
        assert!(warnings.is_empty(), "unexpected warnings {warnings:?}");

        // anisotropic spacing within the exact bound stays quiet too
        let (d, warnings) =
            warnings_during(|| GlobalDomain::new(9, 99, Extent::default(), 1.0, 0.9).unwrap());
        assert!(d.courant_number() > std::f64::consts::FRAC_1_SQRT_2);
        assert!(d.is_stable());
        assert!(warnings.is_empty(), "unexpected warnings {warnings:?}");
    }

    #[test]
    fn oversized_time_step_warns_once() {
        let (d, warnings) = warnings_during(|| {
            GlobalDomain::with_dt(100, 100, Extent::default(), 1.0, 1.0).unwrap()
        });
        assert!(!d.is_stable());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("stability limit"));
        assert_eq!(d.dt(), 1.0);
    }

    #[test]
    fn spacing_includes_boundary_points() {
        let d = GlobalDomain::with_dt(99, 99, Extent::default(), 1.0, 0.001).unwrap();
        assert!((d.dx() - 0.02).abs() < 1e-15);
        assert!((d.x(0) + 1.0).abs() < 1e-15);
        assert!((d.x(100) - 1.0).abs() < 1e-12);
        assert!((d.y(50)).abs() < 1e-12);
    }

    #[test]
    fn courant_sets_dt() {
        let d = GlobalDomain::new(9, 19, Extent::default(), 2.0, 0.5).unwrap();
        assert!((d.dt() - 0.5 * d.dy() / 2.0).abs() < 1e-15);
        assert!((d.courant_number() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_grid_and_bad_numbers() {
        assert_eq!(
            GlobalDomain::new(0, 4, Extent::default(), 1.0, 0.5),
            Err(DecompError::EmptyDomain { nx: 0, ny: 4 })
        );
        assert!(GlobalDomain::new(4, 4, Extent::default(), -1.0, 0.5).is_err());
        assert!(GlobalDomain::new(4, 4, Extent::default(), 1.0, 0.0).is_err());
        let flat = Extent {
            x_min: 1.0,
            x_max: 1.0,
            ..Extent::default()
        };
        assert!(GlobalDomain::new(4, 4, flat, 1.0, 0.5).is_err());
    }
}
