use halo_wave::algs::communicator::{BARRIER_TAG, CommTag, Communicator, HALO_TAG, ThreadComm};
use halo_wave::decomp_error::DecompError;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn thread_fifo_order_per_tag() {
    let tag = CommTag(0x1001);
    let world = ThreadComm::world(2, TIMEOUT);
    for i in 0..10u8 {
        world[0].send(1, tag.base(), &[i]).unwrap();
    }
    let mut out = Vec::new();
    for _ in 0..10 {
        let mut b = [0u8; 1];
        world[1].recv(0, tag.base(), &mut b).unwrap();
        out.push(b[0]);
    }
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
fn tags_do_not_mix() {
    let world = ThreadComm::world(2, TIMEOUT);
    world[0].send(1, HALO_TAG.as_u16(), b"halo").unwrap();
    world[0].send(1, HALO_TAG.offset(1).as_u16(), b"east").unwrap();
    let mut b = [0u8; 4];
    world[1].recv(0, HALO_TAG.offset(1).as_u16(), &mut b).unwrap();
    assert_eq!(&b, b"east");
    world[1].recv(0, HALO_TAG.as_u16(), &mut b).unwrap();
    assert_eq!(&b, b"halo");
}

#[test]
fn ring_shift() {
    let n = 5;
    let results = ThreadComm::run(n, TIMEOUT, |comm| {
        let r = comm.rank();
        let right = (r + 1) % n;
        let left = (r + n - 1) % n;
        // send right, receive from left: two half-rings on distinct peers
        comm.send(right, 7, &(r as u32).to_le_bytes())?;
        let mut b = [0u8; 4];
        comm.recv(left, 7, &mut b)?;
        Ok(u32::from_le_bytes(b) as usize)
    });
    for (r, got) in results.into_iter().enumerate() {
        assert_eq!(got, Ok((r + n - 1) % n));
    }
}

#[test]
fn barrier_and_reduce_across_many_ranks() {
    let results = ThreadComm::run(7, TIMEOUT, |comm| {
        comm.barrier()?;
        let total = comm.reduce_sum(0, comm.rank() as f64)?;
        comm.barrier()?;
        Ok(total)
    });
    assert_eq!(results[0], Ok(Some(21.0)));
    assert!(results[1..].iter().all(|r| *r == Ok(None)));
    assert_ne!(BARRIER_TAG, HALO_TAG);
}

#[test]
fn bad_peers_are_rejected() {
    let world = ThreadComm::world(2, TIMEOUT);
    assert_eq!(
        world[0].send(2, 0, &[]),
        Err(DecompError::RankOutOfRange { rank: 2, nprocs: 2 })
    );
    assert!(matches!(
        world[0].send(0, 0, &[]),
        Err(DecompError::CommError { neighbor: 0, .. })
    ));
}
