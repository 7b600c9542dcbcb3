//! Run with `cargo mpirun -n 2 --features mpi-support --test mpi_smoke`.
#![cfg(feature = "mpi-support")]

use halo_wave::prelude::*;

#[test]
fn mpi_wave_run_matches_rank_fill_and_finishes() {
    let comm = MpiComm::new().unwrap();
    let n = comm.size();
    let topo = partition_with_shape(n, 1, 8 * n, 8).unwrap();
    let domain = GlobalDomain::new(8 * n, 8, Extent::default(), 1.0, 0.5).unwrap();

    let mut solver = WaveSolver::new(&comm, &topo, domain, 0).unwrap();
    solver.run(&Gaussian::default(), 5).unwrap();
    let summary = solver.summary().unwrap();
    assert_eq!(summary.is_some(), comm.rank() == 0);

    let reducer = *solver.reducer();
    let got = halo_wave::algs::reduction::rank_fill_reduction(solver.grid_mut(), &reducer, &comm)
        .unwrap();
    if comm.rank() == 0 {
        let want = halo_wave::algs::reduction::expected_rank_fill_sum(n, 8, 8);
        assert_eq!(got, Some(want));
    }
    solver.finish().unwrap();
}
