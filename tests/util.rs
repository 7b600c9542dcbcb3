#![allow(dead_code)]
use halo_wave::algs::communicator::ThreadComm;
use halo_wave::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(10);

pub fn domain(nx: usize, ny: usize) -> GlobalDomain {
    GlobalDomain::new(nx, ny, Extent::default(), 1.0, 0.5).unwrap()
}

/// Per-rank outcome of a wave run: the block and its final `current` level.
#[derive(Clone, Debug)]
pub struct RankResult {
    pub region: LocalRegion,
    pub current: Field,
    pub summary: Option<FieldSummary>,
}

/// Run the wave solver on `topo.nprocs()` in-process ranks.
pub fn run_wave(topo: &WorkerTopology, nsteps: usize) -> Vec<RankResult> {
    let (nx, ny) = topo.global_size();
    let results = ThreadComm::run(topo.nprocs(), TIMEOUT, |comm| {
        let mut solver = WaveSolver::new(comm, topo, domain(nx, ny), 0)?;
        solver.run(&Gaussian::default(), nsteps)?;
        let summary = solver.summary()?;
        solver.finish()?;
        Ok(RankResult {
            region: *solver.region(),
            current: solver.grid().current().clone(),
            summary,
        })
    });
    results.into_iter().map(Result::unwrap).collect()
}

/// Assemble the owned interiors into a row-major `nx x ny` array.
pub fn gather(topo: &WorkerTopology, ranks: &[RankResult]) -> Vec<f64> {
    let (nx, ny) = topo.global_size();
    let mut global = vec![f64::NAN; nx * ny];
    for r in ranks {
        for li in 1..=r.region.nxnom {
            for lj in 1..=r.region.nynom {
                let (gi, gj) = r.region.to_global(li, lj);
                global[(gi - 1) * ny + (gj - 1)] = r.current.get(li, lj);
            }
        }
    }
    global
}

/// Field for `region` with interior values drawn from a seeded RNG.
pub fn random_field(region: &LocalRegion, seed: u64) -> Field {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut f = Field::for_region(region);
    f.fill_interior_with(|_, _| rng.gen_range(-1.0..1.0));
    f
}

/// Deterministic value at a global point, distinct everywhere.
pub fn tag_value(gi: usize, gj: usize) -> f64 {
    (1000 * gi + gj) as f64
}
