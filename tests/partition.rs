use halo_wave::decomp_error::Axis;
use halo_wave::prelude::*;
use proptest::prelude::*;

#[test]
fn two_workers_split_along_x() {
    let t = partition(2, 100, 100).unwrap();
    assert_eq!((t.nxprocs(), t.nyprocs()), (2, 1));
    assert_eq!(t.nominal_size(), (50, 100));

    let r0 = t.region(0).unwrap();
    let r1 = t.region(1).unwrap();
    assert_eq!((r0.gixs, r0.gixe, r0.giys, r0.giye), (1, 50, 1, 100));
    assert_eq!((r1.gixs, r1.gixe), (51, 100));
    assert_eq!(r0.neighbors.get(Direction::East), Some(1));
    assert_eq!(r1.neighbors.get(Direction::West), Some(0));
    assert!(r0.owns_edge(Direction::West) && !r0.owns_edge(Direction::East));
    assert!(r1.owns_edge(Direction::East) && !r1.owns_edge(Direction::West));
    for r in [r0, r1] {
        assert!(r.owns_edge(Direction::South) && r.owns_edge(Direction::North));
    }
}

#[test]
fn square_grid_on_four_workers_is_two_by_two() {
    let t = partition(4, 8, 8).unwrap();
    assert_eq!((t.nxprocs(), t.nyprocs()), (2, 2));
    // x-major rank layout
    assert_eq!(t.coords(1).unwrap(), (0, 1));
    assert_eq!(t.coords(2).unwrap(), (1, 0));
    let r3 = t.region(3).unwrap();
    assert_eq!(r3.neighbors.get(Direction::West), Some(1));
    assert_eq!(r3.neighbors.get(Direction::South), Some(2));
    assert_eq!(r3.neighbors.get(Direction::East), None);
    let owned: Vec<_> = r3.edges.iter().collect();
    assert_eq!(owned, vec![Direction::East, Direction::North]);
}

#[test]
fn degenerate_axes_are_rejected() {
    assert!(matches!(
        partition(4, 100, 1),
        Err(DecompError::ZeroWorkers { axis: Axis::Y, .. })
    ));
    assert!(matches!(
        partition(4, 1, 100),
        Err(DecompError::NotFactorable { nprocs: 4, .. })
    ));
    assert_eq!(partition(0, 4, 4).err(), Some(DecompError::NoWorkers));
    assert_eq!(
        partition(1, 0, 4).err(),
        Some(DecompError::EmptyDomain { nx: 0, ny: 4 })
    );
}

#[test]
fn uneven_split_is_rejected() {
    assert_eq!(
        partition(2, 7, 7).err(),
        Some(DecompError::UnevenSplit {
            axis: Axis::X,
            points: 7,
            workers: 2
        })
    );
    assert!(matches!(
        partition_with_shape(1, 3, 4, 8),
        Err(DecompError::UnevenSplit { axis: Axis::Y, .. })
    ));
}

#[test]
fn rank_out_of_range() {
    let t = partition(2, 4, 4).unwrap();
    assert_eq!(
        t.region(2).err(),
        Some(DecompError::RankOutOfRange { rank: 2, nprocs: 2 })
    );
}

proptest! {
    #[test]
    fn explicit_shapes_tile_the_grid(
        nxprocs in 1usize..5,
        nyprocs in 1usize..5,
        nxnom in 1usize..6,
        nynom in 1usize..6,
    ) {
        let (nx, ny) = (nxprocs * nxnom, nyprocs * nynom);
        let t = partition_with_shape(nxprocs, nyprocs, nx, ny).unwrap();
        prop_assert!(t.validate_invariants().is_ok());

        let mut owners = vec![0u32; nx * ny];
        for r in t.regions() {
            prop_assert_eq!((r.nxnom, r.nynom), (nxnom, nynom));
            prop_assert_eq!(r.owns_edge(Direction::West), r.px == 0);
            prop_assert_eq!(r.owns_edge(Direction::East), r.px + 1 == nxprocs);
            prop_assert_eq!(r.owns_edge(Direction::South), r.py == 0);
            prop_assert_eq!(r.owns_edge(Direction::North), r.py + 1 == nyprocs);
            for dir in Direction::ALL {
                // a side is either a physical edge or has a neighbor, never both
                prop_assert_ne!(r.owns_edge(dir), r.neighbors.get(dir).is_some());
            }
            for gi in r.gixs..=r.gixe {
                for gj in r.giys..=r.giye {
                    owners[(gi - 1) * ny + (gj - 1)] += 1;
                }
            }
        }
        prop_assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn heuristic_is_exact_or_refuses(nprocs in 1usize..17, nx in 1usize..65, ny in 1usize..65) {
        match partition(nprocs, nx, ny) {
            Ok(t) => {
                prop_assert_eq!(t.nxprocs() * t.nyprocs(), nprocs);
                prop_assert_eq!(nx % t.nxprocs(), 0);
                prop_assert_eq!(ny % t.nyprocs(), 0);
                prop_assert!(t.validate_invariants().is_ok());
            }
            Err(e) => prop_assert!(e.is_configuration()),
        }
    }

    #[test]
    fn local_global_maps_agree(nxnom in 1usize..6, nynom in 1usize..6) {
        let t = partition_with_shape(2, 2, 2 * nxnom, 2 * nynom).unwrap();
        for r in t.regions() {
            for li in 1..=r.nxnom {
                for lj in 1..=r.nynom {
                    let (gi, gj) = r.to_global(li, lj);
                    prop_assert_eq!(r.to_local(gi, gj), Some((li, lj)));
                }
            }
            prop_assert_eq!(r.to_local(r.gixe + 1, r.giys), None);
        }
    }
}
