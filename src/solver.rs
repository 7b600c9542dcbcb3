//! Per-worker driver for the distributed wave equation.
//!
//! Every rank builds one [`WaveSolver`] over its [`LocalRegion`] and runs the
//! same sequence of calls. A time step is
//!
//! 1. exchange the ghosts of `current` with every neighbor,
//! 2. re-impose the Dirichlet value on owned physical edges,
//! 3. apply the leapfrog stencil to the interior and rotate the levels.
//!
//! The blocking exchange is the only synchronization between steps.

use crate::algs::communicator::Communicator;
use crate::algs::halo_exchange::HaloExchanger;
use crate::algs::reduction::GlobalReducer;
use crate::algs::stencil::StencilStepper;
use crate::data::bc::{apply_dirichlet, apply_dirichlet_to_field};
use crate::data::initial::{InitialCondition, sample_into};
use crate::data::local_grid::LocalGrid;
use crate::debug_invariants::DebugInvariants;
use crate::decomp_error::DecompError;
use crate::domain::GlobalDomain;
use crate::topology::{LocalRegion, WorkerTopology};

/// Result of a global field reduction, available on the root rank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSummary {
    /// Plain sum of every owned interior value.
    pub sum: f64,
    /// `sum * dx * dy`.
    pub integral: f64,
}

pub struct WaveSolver<'a, C: Communicator + ?Sized> {
    comm: &'a C,
    domain: GlobalDomain,
    grid: LocalGrid,
    exchanger: HaloExchanger,
    stepper: StencilStepper,
    reducer: GlobalReducer,
    steps: usize,
}

impl<'a, C> WaveSolver<'a, C>
where
    C: Communicator + ?Sized,
{
    /// Set up the local block of `comm.rank()`.
    ///
    /// Fails if the communicator and the topology disagree on the world size
    /// or if `root` is not a valid rank.
    pub fn new(
        comm: &'a C,
        topology: &WorkerTopology,
        domain: GlobalDomain,
        root: usize,
    ) -> Result<Self, DecompError> {
        if comm.size() != topology.nprocs() {
            return Err(DecompError::WorldSizeMismatch {
                expected: topology.nprocs(),
                actual: comm.size(),
            });
        }
        if root >= topology.nprocs() {
            return Err(DecompError::RankOutOfRange {
                rank: root,
                nprocs: topology.nprocs(),
            });
        }
        if topology.global_size() != (domain.nx(), domain.ny()) {
            return Err(DecompError::InvalidConfig(format!(
                "topology covers {:?} points, domain has {}x{}",
                topology.global_size(),
                domain.nx(),
                domain.ny()
            )));
        }
        let region = topology.region(comm.rank())?;
        log::debug!(
            "[rank {}] block ({}, {}) owns x {}..={} y {}..={}, physical edges {:?}",
            comm.rank(),
            region.px,
            region.py,
            region.gixs,
            region.gixe,
            region.giys,
            region.giye,
            region.edges
        );
        let grid = LocalGrid::new(region);
        grid.debug_assert_invariants();
        Ok(Self {
            comm,
            stepper: StencilStepper::new(&domain),
            domain,
            grid,
            exchanger: HaloExchanger::new(),
            reducer: GlobalReducer::new(root),
            steps: 0,
        })
    }

    pub fn domain(&self) -> &GlobalDomain {
        &self.domain
    }

    pub fn region(&self) -> &LocalRegion {
        self.grid.region()
    }

    pub fn grid(&self) -> &LocalGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut LocalGrid {
        &mut self.grid
    }

    pub fn reducer(&self) -> &GlobalReducer {
        &self.reducer
    }

    /// Time levels advanced so far, counting the first step.
    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    /// Sample `ic` into `previous` and take the zero-velocity first step.
    ///
    /// Resets the step count, so a solver can be re-initialized.
    pub fn initialize<I>(&mut self, ic: &I) -> Result<(), DecompError>
    where
        I: InitialCondition + ?Sized,
    {
        let region = *self.grid.region();
        let (previous, current, next) = self.grid.levels_mut();
        previous.fill(0.0);
        current.fill(0.0);
        next.fill(0.0);
        sample_into(previous, &region, &self.domain, ic);
        self.exchanger.exchange(previous, &region, self.comm)?;
        apply_dirichlet_to_field(previous, region.edges, 0.0);
        self.stepper.first_step(&mut self.grid);
        self.steps = 1;
        log::debug!("[rank {}] initialized", self.comm.rank());
        Ok(())
    }

    /// Advance one time level. Requires [`initialize`](Self::initialize).
    pub fn step(&mut self) -> Result<(), DecompError> {
        if self.steps == 0 {
            return Err(DecompError::InvalidConfig(
                "step called before initialize".into(),
            ));
        }
        let region = *self.grid.region();
        self.exchanger
            .exchange(self.grid.current_mut(), &region, self.comm)?;
        apply_dirichlet(&mut self.grid);
        self.stepper.step(&mut self.grid);
        self.steps += 1;
        log::trace!("[rank {}] step {}", self.comm.rank(), self.steps);
        Ok(())
    }

    /// Initialize from `ic` and advance until `nsteps` time levels have been
    /// computed. `nsteps == 0` is a no-op.
    pub fn run<I>(&mut self, ic: &I, nsteps: usize) -> Result<(), DecompError>
    where
        I: InitialCondition + ?Sized,
    {
        if nsteps == 0 {
            return Ok(());
        }
        self.initialize(ic)?;
        while self.steps < nsteps {
            self.step()?;
        }
        Ok(())
    }

    /// Global sum and integral of `current`. `Some` on the root only.
    pub fn summary(&self) -> Result<Option<FieldSummary>, DecompError> {
        let area = self.domain.cell_area();
        Ok(self
            .reducer
            .reduce_field(self.comm, self.grid.current())?
            .map(|sum| FieldSummary {
                sum,
                integral: sum * area,
            }))
    }

    /// Synchronize every rank before teardown.
    pub fn finish(&self) -> Result<(), DecompError> {
        self.grid.debug_assert_invariants();
        self.comm.barrier()
    }
}
