//! Global reductions over owned interior cells.
//!
//! Each worker sums only the cells it owns (ghosts duplicate neighbor data),
//! then one collective sum combines the local scalars on the root rank. The
//! combination order depends on the backend and the world size, so results
//! agree across process counts only up to floating-point tolerance.

use crate::algs::communicator::Communicator;
use crate::data::local_grid::{Field, LocalGrid};
use crate::decomp_error::DecompError;

/// Sum-reduction to a designated root rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalReducer {
    root: usize,
}

impl GlobalReducer {
    pub fn new(root: usize) -> Self {
        Self { root }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// Combine one scalar per worker. `Some(total)` on the root, `None` elsewhere.
    pub fn reduce_sum<C>(&self, comm: &C, local: f64) -> Result<Option<f64>, DecompError>
    where
        C: Communicator + ?Sized,
    {
        comm.reduce_sum(self.root, local)
    }

    /// Global sum of the owned interior of `field`.
    pub fn reduce_field<C>(&self, comm: &C, field: &Field) -> Result<Option<f64>, DecompError>
    where
        C: Communicator + ?Sized,
    {
        self.reduce_sum(comm, field.interior_sum())
    }
}

/// Reduce-only diagnostic: fill the whole local array with the worker's rank,
/// sum the owned interior and reduce. There is no neighbor coupling; the
/// expected root value is [`expected_rank_fill_sum`].
pub fn rank_fill_reduction<C>(
    grid: &mut LocalGrid,
    reducer: &GlobalReducer,
    comm: &C,
) -> Result<Option<f64>, DecompError>
where
    C: Communicator + ?Sized,
{
    let rank = grid.region().rank as f64;
    grid.current_mut().fill(rank);
    reducer.reduce_field(comm, grid.current())
}

/// `nxnom * nynom * (0 + 1 + ... + nprocs - 1)`.
pub fn expected_rank_fill_sum(nprocs: usize, nxnom: usize, nynom: usize) -> f64 {
    let rank_total = nprocs * nprocs.saturating_sub(1) / 2;
    (nxnom * nynom * rank_total) as f64
}
