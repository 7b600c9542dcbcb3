//! Top-level module for the worker decomposition.
//!
//! This module provides the types describing how the global grid is split:
//! - [`partition`] and [`WorkerTopology`]: worker grid shape and per-rank coordinates
//! - [`LocalRegion`]: the block of global indices one worker owns
//! - [`NeighborTable`] / [`Direction`]: who sits across each side of a block

pub mod neighbors;
pub mod partition;

pub use neighbors::{Direction, EdgeSet, NeighborTable};
pub use partition::{LocalRegion, WorkerTopology, partition, partition_with_shape, proc_grid};
