#![cfg_attr(docsrs, feature(doc_cfg))]
//! # halo-wave
//!
//! halo-wave solves the 2D scalar wave equation with an explicit leapfrog
//! stencil on a regular grid, split evenly among a fixed set of cooperating
//! workers (SPMD). Each worker owns one rectangular block padded by a
//! one-cell ghost border that is refreshed from its neighbors before every
//! update.
//!
//! ## Features
//! - Even block decomposition of an `nx x ny` grid over a rectangular worker grid
//! - Ghost (halo) exchange with up to four neighbors per step
//! - Homogeneous Dirichlet boundary on the physical edges of the global domain
//! - Global sum reduction of owned interior cells
//! - Pluggable communication backends: serial, in-process threads, MPI
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! halo-wave = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "rayon"]
//! ```
//!
//! ```no_run
//! use halo_wave::prelude::*;
//!
//! # fn main() -> Result<(), DecompError> {
//! let cfg = SolverConfig::default();
//! let topo = cfg.topology(1)?;
//! let mut solver = WaveSolver::new(&NoComm, &topo, cfg.domain()?, cfg.root)?;
//! solver.run(&Gaussian::centered(cfg.gaussian_width), cfg.nsteps)?;
//! if let Some(s) = solver.summary()? {
//!     println!("integral = {:.6e}", s.integral);
//! }
//! solver.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Determinism
//!
//! The stencil sweep is bit-identical for any worker count (and with or
//! without `rayon`). Global sums combine per-worker partial sums, so they agree
//! across worker counts up to floating-point tolerance only.

pub mod algs;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod decomp_error;
pub mod domain;
pub mod solver;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use decomp_error::DecompError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    pub use crate::algs::{GlobalReducer, HaloExchanger, StencilStepper};
    pub use crate::config::{RunMode, SolverConfig};
    pub use crate::data::{Field, Gaussian, InitialCondition, LocalGrid, apply_dirichlet};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::decomp_error::DecompError;
    pub use crate::domain::{Extent, GlobalDomain};
    pub use crate::solver::{FieldSummary, WaveSolver};
    pub use crate::topology::{
        Direction, EdgeSet, LocalRegion, NeighborTable, WorkerTopology, partition,
        partition_with_shape,
    };
}
