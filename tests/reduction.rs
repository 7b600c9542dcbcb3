mod util;

use float_cmp::assert_approx_eq;
use halo_wave::algs::communicator::ThreadComm;
use halo_wave::algs::reduction::{expected_rank_fill_sum, rank_fill_reduction};
use halo_wave::prelude::*;
use util::{TIMEOUT, random_field, run_wave};

fn rank_fill(topo: &WorkerTopology, root: usize) -> Vec<Option<f64>> {
    ThreadComm::run(topo.nprocs(), TIMEOUT, |comm| {
        let mut grid = LocalGrid::new(topo.region(comm.rank())?);
        rank_fill_reduction(&mut grid, &GlobalReducer::new(root), comm)
    })
    .into_iter()
    .map(Result::unwrap)
    .collect()
}

#[test]
fn rank_fill_matches_expected_for_several_world_sizes() {
    let cases = [
        partition(1, 6, 6).unwrap(),
        partition(2, 8, 8).unwrap(),
        partition_with_shape(3, 1, 9, 3).unwrap(),
        partition(4, 8, 8).unwrap(),
        partition(8, 16, 16).unwrap(),
    ];
    for topo in &cases {
        let got = rank_fill(topo, 0);
        let (nxnom, nynom) = topo.nominal_size();
        let want = expected_rank_fill_sum(topo.nprocs(), nxnom, nynom);
        assert_eq!(got[0], Some(want), "{} workers", topo.nprocs());
        assert!(got[1..].iter().all(Option::is_none));
    }
}

#[test]
fn non_zero_root_receives_the_total() {
    let topo = partition(4, 8, 8).unwrap();
    let got = rank_fill(&topo, 3);
    assert_eq!(got, vec![None, None, None, Some(96.0)]);
}

#[test]
fn ghost_cells_are_not_counted() {
    let topo = partition(4, 8, 8).unwrap();
    let got = ThreadComm::run(4, TIMEOUT, |comm| {
        let region = topo.region(comm.rank())?;
        let mut f = Field::for_region(&region);
        f.fill(1.0);
        GlobalReducer::default().reduce_field(comm, &f)
    });
    assert_eq!(got[0], Ok(Some(64.0)));
}

#[test]
fn distributed_sum_matches_serial_sum() {
    let serial_topo = partition(1, 8, 8).unwrap();
    let serial_region = serial_topo.region(0).unwrap();
    let serial = random_field(&serial_region, 42);

    let topo = partition(4, 8, 8).unwrap();
    let got = ThreadComm::run(4, TIMEOUT, |comm| {
        let region = topo.region(comm.rank())?;
        let mut f = Field::for_region(&region);
        f.fill_interior_with(|li, lj| {
            let (gi, gj) = region.to_global(li, lj);
            serial.get(gi, gj)
        });
        GlobalReducer::default().reduce_field(comm, &f)
    });
    let total = got[0].clone().unwrap().unwrap();
    assert_approx_eq!(f64, total, serial.interior_sum(), epsilon = 1e-12);
}

#[test]
fn invalid_root_is_rejected() {
    let got = ThreadComm::run(2, TIMEOUT, |comm| GlobalReducer::new(5).reduce_sum(comm, 1.0));
    for r in got {
        assert_eq!(r, Err(DecompError::RankOutOfRange { rank: 5, nprocs: 2 }));
    }
}

#[test]
fn integral_scales_the_sum_by_cell_area() {
    let topo = partition(2, 10, 10).unwrap();
    let ranks = run_wave(&topo, 3);
    let s = ranks[0].summary.unwrap();
    let area = util::domain(10, 10).cell_area();
    assert_eq!(s.integral, s.sum * area);
}
