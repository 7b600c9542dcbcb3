//! Initial conditions sampled at physical coordinates.

use crate::data::local_grid::Field;
use crate::domain::GlobalDomain;
use crate::topology::LocalRegion;
use serde::{Deserialize, Serialize};

/// A scalar function of physical position.
pub trait InitialCondition {
    fn value(&self, x: f64, y: f64) -> f64;
}

impl<F> InitialCondition for F
where
    F: Fn(f64, f64) -> f64,
{
    fn value(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// `exp(-((x - x0)^2 + (y - y0)^2) / width)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
}

impl Gaussian {
    /// Pulse centred at the origin.
    pub fn centered(width: f64) -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            width,
        }
    }
}

impl Default for Gaussian {
    fn default() -> Self {
        Self::centered(0.01)
    }
}

impl InitialCondition for Gaussian {
    fn value(&self, x: f64, y: f64) -> f64 {
        let (dx, dy) = (x - self.x0, y - self.y0);
        (-(dx * dx + dy * dy) / self.width).exp()
    }
}

/// Sample `ic` on the interior points `region` owns. Ghosts are left as-is.
pub fn sample_into<I>(field: &mut Field, region: &LocalRegion, domain: &GlobalDomain, ic: &I)
where
    I: InitialCondition + ?Sized,
{
    field.fill_interior_with(|i, j| {
        let (gi, gj) = region.to_global(i, j);
        ic.value(domain.x(gi), domain.y(gj))
    });
}
