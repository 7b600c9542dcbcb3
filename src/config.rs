//! Run configuration.
//!
//! Defaults reproduce the reference run: a 100x100 grid on `[-1, 1]^2`,
//! unit wave speed, a narrow Gaussian pulse at the origin.

use crate::decomp_error::DecompError;
use crate::domain::{Extent, GlobalDomain};
use crate::topology::{WorkerTopology, partition, partition_with_shape};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What the workers do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Time-step the wave equation and reduce the field integral.
    #[default]
    Wave,
    /// Fill each block with its rank and reduce; no neighbor coupling.
    ReduceCheck,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub nx: usize,
    pub ny: usize,
    pub nsteps: usize,
    pub wave_speed: f64,
    pub courant: f64,
    pub extent: Extent,
    pub gaussian_width: f64,
    /// Explicit `[nxprocs, nyprocs]`; `None` uses the aspect-ratio heuristic.
    pub proc_grid: Option<[usize; 2]>,
    pub exchange_timeout_ms: u64,
    pub root: usize,
    pub mode: RunMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            nx: 100,
            ny: 100,
            nsteps: 10,
            wave_speed: 1.0,
            courant: 0.5,
            extent: Extent::default(),
            gaussian_width: 0.01,
            proc_grid: None,
            exchange_timeout_ms: 30_000,
            root: 0,
            mode: RunMode::Wave,
        }
    }
}

impl SolverConfig {
    pub fn from_json_str(s: &str) -> Result<Self, DecompError> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| DecompError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecompError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DecompError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, DecompError> {
        serde_json::to_string_pretty(self).map_err(|e| DecompError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), DecompError> {
        if self.nx == 0 || self.ny == 0 {
            return Err(DecompError::EmptyDomain {
                nx: self.nx,
                ny: self.ny,
            });
        }
        let positive = [
            ("wave_speed", self.wave_speed),
            ("courant", self.courant),
            ("gaussian_width", self.gaussian_width),
        ];
        for (name, v) in positive {
            if !(v > 0.0) || !v.is_finite() {
                return Err(DecompError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {v}"
                )));
            }
        }
        if !self.extent.is_valid() {
            return Err(DecompError::InvalidConfig(format!(
                "empty physical extent {:?}",
                self.extent
            )));
        }
        if self.exchange_timeout_ms == 0 {
            return Err(DecompError::InvalidConfig(
                "exchange_timeout_ms must be non-zero".into(),
            ));
        }
        if let Some([px, py]) = self.proc_grid {
            if px == 0 || py == 0 {
                return Err(DecompError::InvalidConfig(format!(
                    "proc_grid must be non-zero, got {px}x{py}"
                )));
            }
        }
        Ok(())
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    pub fn domain(&self) -> Result<GlobalDomain, DecompError> {
        GlobalDomain::new(self.nx, self.ny, self.extent, self.wave_speed, self.courant)
    }

    /// Decompose the grid over `nprocs` workers, honoring `proc_grid` if set.
    pub fn topology(&self, nprocs: usize) -> Result<WorkerTopology, DecompError> {
        match self.proc_grid {
            Some([px, py]) => {
                if px.checked_mul(py) != Some(nprocs) {
                    return Err(DecompError::NotFactorable {
                        nprocs,
                        nxprocs: px,
                        nyprocs: py,
                    });
                }
                partition_with_shape(px, py, self.nx, self.ny)
            }
            None => partition(nprocs, self.nx, self.ny),
        }
    }
}
