//! Data module: ghosted local arrays, boundary conditions and initial data

pub mod bc;
pub mod initial;
pub mod local_grid;

pub use bc::{apply_dirichlet, apply_dirichlet_with};
pub use initial::{Gaussian, InitialCondition};
pub use local_grid::{Field, LocalGrid};
