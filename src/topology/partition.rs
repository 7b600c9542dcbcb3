//! GridPartitioner: split the global grid evenly over a rectangular worker grid.
//!
//! The worker grid shape follows the `nx : ny` aspect ratio of the global grid
//! (a load-balance heuristic, not an optimum). Uneven splits are refused:
//! every worker owns exactly `nxnom * nynom` interior points.
//!
//! Ranks are laid out x-major: `px = rank / nyprocs`, `py = rank % nyprocs`,
//! so x-neighbors differ by `nyprocs` and y-neighbors by `1`. The neighbor
//! table is built once here and never recomputed.

use crate::debug_invariants::DebugInvariants;
use crate::decomp_error::{Axis, DecompError};
use crate::topology::neighbors::{Direction, EdgeSet, NeighborTable};
use itertools::iproduct;

/// Choose `(nxprocs, nyprocs)` for `nprocs` workers on an `nx x ny` grid.
///
/// `nyprocs = floor(nprocs * ny / (nx + ny))`, `nxprocs = nprocs / nyprocs`.
/// A single worker always gets `1 x 1`. Zero factors and shapes that do not
/// multiply back to `nprocs` are errors.
pub fn proc_grid(nprocs: usize, nx: usize, ny: usize) -> Result<(usize, usize), DecompError> {
    if nprocs == 0 {
        return Err(DecompError::NoWorkers);
    }
    if nx == 0 || ny == 0 {
        return Err(DecompError::EmptyDomain { nx, ny });
    }
    if nprocs == 1 {
        return Ok((1, 1));
    }
    let overflow = || {
        DecompError::InvalidConfig(format!(
            "{nprocs} workers on a {nx}x{ny} grid overflows the partition arithmetic"
        ))
    };
    let nyprocs = nprocs
        .checked_mul(ny)
        .zip(nx.checked_add(ny))
        .map(|(num, den)| num / den)
        .ok_or_else(overflow)?;
    if nyprocs == 0 {
        return Err(DecompError::ZeroWorkers {
            axis: Axis::Y,
            nprocs,
            nx,
            ny,
        });
    }
    let nxprocs = nprocs / nyprocs;
    if nxprocs == 0 {
        return Err(DecompError::ZeroWorkers {
            axis: Axis::X,
            nprocs,
            nx,
            ny,
        });
    }
    if nxprocs * nyprocs != nprocs {
        return Err(DecompError::NotFactorable {
            nprocs,
            nxprocs,
            nyprocs,
        });
    }
    Ok((nxprocs, nyprocs))
}

/// Partition `nx x ny` points over `nprocs` workers using [`proc_grid`].
pub fn partition(nprocs: usize, nx: usize, ny: usize) -> Result<WorkerTopology, DecompError> {
    let (nxprocs, nyprocs) = proc_grid(nprocs, nx, ny)?;
    partition_with_shape(nxprocs, nyprocs, nx, ny)
}

/// Partition over an explicit `nxprocs x nyprocs` worker grid.
pub fn partition_with_shape(
    nxprocs: usize,
    nyprocs: usize,
    nx: usize,
    ny: usize,
) -> Result<WorkerTopology, DecompError> {
    if nx == 0 || ny == 0 {
        return Err(DecompError::EmptyDomain { nx, ny });
    }
    let nprocs = nxprocs.checked_mul(nyprocs).ok_or_else(|| {
        DecompError::InvalidConfig(format!(
            "worker grid {nxprocs}x{nyprocs} overflows the rank count"
        ))
    })?;
    if nxprocs == 0 || nyprocs == 0 {
        let axis = if nxprocs == 0 { Axis::X } else { Axis::Y };
        return Err(DecompError::ZeroWorkers {
            axis,
            nprocs,
            nx,
            ny,
        });
    }
    if nx % nxprocs != 0 {
        return Err(DecompError::UnevenSplit {
            axis: Axis::X,
            points: nx,
            workers: nxprocs,
        });
    }
    if ny % nyprocs != 0 {
        return Err(DecompError::UnevenSplit {
            axis: Axis::Y,
            points: ny,
            workers: nyprocs,
        });
    }

    let rank_of = |px: usize, py: usize| px * nyprocs + py;
    let neighbors = (0..nprocs)
        .map(|rank| {
            let (px, py) = (rank / nyprocs, rank % nyprocs);
            NeighborTable::new(
                (px > 0).then(|| rank_of(px - 1, py)),
                (px + 1 < nxprocs).then(|| rank_of(px + 1, py)),
                (py > 0).then(|| rank_of(px, py - 1)),
                (py + 1 < nyprocs).then(|| rank_of(px, py + 1)),
            )
        })
        .collect();

    let topo = WorkerTopology {
        nprocs,
        nxprocs,
        nyprocs,
        nx,
        ny,
        nxnom: nx / nxprocs,
        nynom: ny / nyprocs,
        neighbors,
    };
    log::info!(
        "partitioned {}x{} points over {}x{} workers ({}x{} per worker)",
        nx,
        ny,
        nxprocs,
        nyprocs,
        topo.nxnom,
        topo.nynom
    );
    crate::debug_invariants!(topo.validate_invariants(), "WorkerTopology");
    Ok(topo)
}

/// Worker grid shape, per-rank coordinates and the neighbor table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerTopology {
    nprocs: usize,
    nxprocs: usize,
    nyprocs: usize,
    nx: usize,
    ny: usize,
    nxnom: usize,
    nynom: usize,
    neighbors: Vec<NeighborTable>,
}

impl WorkerTopology {
    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    pub fn nxprocs(&self) -> usize {
        self.nxprocs
    }

    pub fn nyprocs(&self) -> usize {
        self.nyprocs
    }

    /// Global point counts `(nx, ny)`.
    pub fn global_size(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Nominal interior points per worker `(nxnom, nynom)`.
    pub fn nominal_size(&self) -> (usize, usize) {
        (self.nxnom, self.nynom)
    }

    fn check_rank(&self, rank: usize) -> Result<(), DecompError> {
        if rank < self.nprocs {
            Ok(())
        } else {
            Err(DecompError::RankOutOfRange {
                rank,
                nprocs: self.nprocs,
            })
        }
    }

    /// Worker-grid coordinate `(px, py)` of `rank`.
    pub fn coords(&self, rank: usize) -> Result<(usize, usize), DecompError> {
        self.check_rank(rank)?;
        Ok((rank / self.nyprocs, rank % self.nyprocs))
    }

    /// Rank at worker-grid coordinate `(px, py)`, if it exists.
    pub fn rank_at(&self, px: usize, py: usize) -> Option<usize> {
        (px < self.nxprocs && py < self.nyprocs).then(|| px * self.nyprocs + py)
    }

    pub fn neighbors(&self, rank: usize) -> Result<&NeighborTable, DecompError> {
        self.check_rank(rank)?;
        Ok(&self.neighbors[rank])
    }

    /// Local region owned by `rank`.
    pub fn region(&self, rank: usize) -> Result<LocalRegion, DecompError> {
        let (px, py) = self.coords(rank)?;
        let neighbors = self.neighbors[rank];
        let gixs = px * self.nxnom + 1;
        let giys = py * self.nynom + 1;
        Ok(LocalRegion {
            rank,
            px,
            py,
            gixs,
            gixe: gixs + self.nxnom - 1,
            giys,
            giye: giys + self.nynom - 1,
            nxnom: self.nxnom,
            nynom: self.nynom,
            edges: neighbors.physical_edges(),
            neighbors,
        })
    }

    /// Regions of every rank, in rank order.
    pub fn regions(&self) -> impl Iterator<Item = LocalRegion> + '_ {
        (0..self.nprocs).filter_map(move |r| self.region(r).ok())
    }
}

impl DebugInvariants for WorkerTopology {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "WorkerTopology");
    }

    fn validate_invariants(&self) -> Result<(), DecompError> {
        if self.nxprocs * self.nyprocs != self.nprocs {
            return Err(DecompError::NotFactorable {
                nprocs: self.nprocs,
                nxprocs: self.nxprocs,
                nyprocs: self.nyprocs,
            });
        }
        if self.nxnom * self.nxprocs != self.nx {
            return Err(DecompError::UnevenSplit {
                axis: Axis::X,
                points: self.nx,
                workers: self.nxprocs,
            });
        }
        if self.nynom * self.nyprocs != self.ny {
            return Err(DecompError::UnevenSplit {
                axis: Axis::Y,
                points: self.ny,
                workers: self.nyprocs,
            });
        }
        // Every coordinate is used exactly once and the blocks abut.
        for (px, py) in iproduct!(0..self.nxprocs, 0..self.nyprocs) {
            let rank = px * self.nyprocs + py;
            let region = self.region(rank)?;
            if (region.px, region.py) != (px, py)
                || region.gixs != px * self.nxnom + 1
                || region.giys != py * self.nynom + 1
            {
                return Err(DecompError::InvalidConfig(format!(
                    "rank {rank} region {region:?} does not tile the grid"
                )));
            }
        }
        // The neighbor relation must be symmetric or exchanges deadlock.
        for (rank, table) in self.neighbors.iter().enumerate() {
            for (dir, nbr) in table.iter() {
                let back = self.neighbors(nbr)?.get(dir.opposite());
                if back != Some(rank) {
                    return Err(DecompError::CommError {
                        neighbor: nbr,
                        message: format!(
                            "asymmetric topology: rank {rank} sees {nbr} to the {dir:?}, \
                             but {nbr} sees {back:?}"
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The block of the global grid owned by one worker.
///
/// Global indices are 1-based and inclusive (`gixs..=gixe`); the local array
/// adds one ghost cell on each side, so local interior indices run `1..=nxnom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalRegion {
    pub rank: usize,
    pub px: usize,
    pub py: usize,
    pub gixs: usize,
    pub gixe: usize,
    pub giys: usize,
    pub giye: usize,
    pub nxnom: usize,
    pub nynom: usize,
    pub edges: EdgeSet,
    pub neighbors: NeighborTable,
}

impl LocalRegion {
    /// Local array extent along x, ghosts included.
    pub fn local_size_x(&self) -> usize {
        self.nxnom + 2
    }

    /// Local array extent along y, ghosts included.
    pub fn local_size_y(&self) -> usize {
        self.nynom + 2
    }

    /// Whether this worker owns the physical edge on side `dir`.
    pub fn owns_edge(&self, dir: Direction) -> bool {
        self.edges.contains(dir)
    }

    pub fn contains_global(&self, gi: usize, gj: usize) -> bool {
        (self.gixs..=self.gixe).contains(&gi) && (self.giys..=self.giye).contains(&gj)
    }

    /// Local interior index of global point `(gi, gj)`, if owned here.
    pub fn to_local(&self, gi: usize, gj: usize) -> Option<(usize, usize)> {
        self.contains_global(gi, gj)
            .then(|| (gi - self.gixs + 1, gj - self.giys + 1))
    }

    /// Global index of local index `(li, lj)`; ghost cells map to the
    /// neighboring global index (possibly the boundary row `0` / `n + 1`).
    pub fn to_global(&self, li: usize, lj: usize) -> (usize, usize) {
        (self.gixs + li - 1, self.giys + lj - 1)
    }
}
