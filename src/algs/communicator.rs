//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees) addressed
//! by rank and tag. Every receive is bounded by a timeout: a mismatched
//! neighbor computation surfaces as [`DecompError::CommTimeout`] (threads)
//! or aborts the MPI world, instead of hanging the run.
//!
//! The four primitives the solver needs are point-to-point send/receive,
//! a sum-reduction to a root rank and a barrier. The collectives have default
//! implementations on top of point-to-point messages; backends with native
//! collectives override them.

use crate::decomp_error::DecompError;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use static_assertions::assert_impl_all;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exit code used when a bounded wait expires and the world is aborted.
pub const TIMEOUT_EXIT_CODE: i32 = 3;

/// Typed message tag. Phases reserve disjoint ranges via [`CommTag::offset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Raw base value.
    pub const fn base(self) -> u16 {
        self.0
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }
}

/// Halo traffic; offset by the direction of travel.
pub const HALO_TAG: CommTag = CommTag(0x4A00);
/// Sum reduction to root.
pub const REDUCE_TAG: CommTag = CommTag(0x5200);
/// Barrier arrive/release.
pub const BARRIER_TAG: CommTag = CommTag(0x5300);

/// Blocking communication interface.
pub trait Communicator {
    /// This worker's rank.
    fn rank(&self) -> usize;
    /// Number of workers in the world.
    fn size(&self) -> usize;

    /// Send `buf` to `peer`. May return before the peer has received it.
    fn send(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), DecompError>;

    /// Receive exactly `buf.len()` bytes from `peer`.
    fn recv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Result<(), DecompError>;

    /// Paired exchange with one neighbor. The default assumes a buffered
    /// `send`; backends whose sends can block must override it.
    fn sendrecv(
        &self,
        peer: usize,
        send_tag: u16,
        send: &[u8],
        recv_tag: u16,
        recv: &mut [u8],
    ) -> Result<(), DecompError> {
        self.send(peer, send_tag, send)?;
        self.recv(peer, recv_tag, recv)
    }

    /// Sum `value` over all ranks. Returns `Some(total)` on `root` only.
    ///
    /// The default sums in rank order, so it is deterministic for a fixed
    /// world size.
    fn reduce_sum(&self, root: usize, value: f64) -> Result<Option<f64>, DecompError> {
        let size = self.size();
        if root >= size {
            return Err(DecompError::RankOutOfRange { rank: root, nprocs: size });
        }
        let tag = REDUCE_TAG.as_u16();
        if self.rank() != root {
            self.send(root, tag, &value.to_le_bytes())?;
            return Ok(None);
        }
        let mut total = 0.0;
        for r in 0..size {
            if r == root {
                total += value;
            } else {
                let mut raw = [0u8; 8];
                self.recv(r, tag, &mut raw)?;
                total += f64::from_le_bytes(raw);
            }
        }
        Ok(Some(total))
    }

    /// Block until every rank has entered the barrier.
    fn barrier(&self) -> Result<(), DecompError> {
        let size = self.size();
        if size <= 1 {
            return Ok(());
        }
        let arrive = BARRIER_TAG.as_u16();
        let release = BARRIER_TAG.offset(1).as_u16();
        if self.rank() == 0 {
            for r in 1..size {
                self.recv(r, arrive, &mut [])?;
            }
            for r in 1..size {
                self.send(r, release, &[])?;
            }
        } else {
            self.send(0, arrive, &[])?;
            self.recv(0, release, &mut [])?;
        }
        Ok(())
    }

    /// Terminate every worker with `code`.
    fn abort(&self, code: i32) -> !;
}

fn check_peer(rank: usize, peer: usize, size: usize) -> Result<(), DecompError> {
    if peer >= size {
        return Err(DecompError::RankOutOfRange { rank: peer, nprocs: size });
    }
    if peer == rank {
        return Err(DecompError::CommError {
            neighbor: peer,
            message: "self-messages are not supported".into(),
        });
    }
    Ok(())
}

/// Single-worker backend for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, peer: usize, _tag: u16, _buf: &[u8]) -> Result<(), DecompError> {
        check_peer(0, peer, 1)
    }

    fn recv(&self, peer: usize, _tag: u16, _buf: &mut [u8]) -> Result<(), DecompError> {
        check_peer(0, peer, 1)
    }

    fn abort(&self, code: i32) -> ! {
        log::error!("aborting with code {code}");
        std::process::exit(code)
    }
}

// --- ThreadComm: intra-process / one thread per rank ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    queues: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

/// In-process world: each rank is a thread, messages go through a shared
/// mailbox (FIFO per `(src, dst, tag)`). Sends never block.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    timeout: Duration,
    mailbox: Arc<Mailbox>,
}

assert_impl_all!(ThreadComm: Send, Sync, Clone);
assert_impl_all!(NoComm: Send, Sync);

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ThreadComm {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Handles for ranks `0..size`, all sharing one mailbox.
    pub fn world(size: usize, timeout: Duration) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                timeout,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }

    /// Run `f` on every rank of a fresh `size`-rank world (SPMD) and collect
    /// the per-rank results in rank order.
    pub fn run<T, F>(size: usize, timeout: Duration, f: F) -> Vec<Result<T, DecompError>>
    where
        T: Send,
        F: Fn(&ThreadComm) -> Result<T, DecompError> + Sync,
    {
        let comms = Self::world(size, timeout);
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| {
                    h.join().unwrap_or_else(|_| {
                        Err(DecompError::CommError {
                            neighbor: rank,
                            message: "worker thread panicked".into(),
                        })
                    })
                })
                .collect()
        })
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), DecompError> {
        check_peer(self.rank, peer, self.size)?;
        let key = (self.rank, peer, tag);
        self.mailbox
            .queues
            .lock()
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.arrived.notify_all();
        Ok(())
    }

    fn recv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Result<(), DecompError> {
        check_peer(self.rank, peer, self.size)?;
        let key = (peer, self.rank, tag);
        let deadline = Instant::now() + self.timeout;
        let mut queues = self.mailbox.queues.lock();
        let msg = loop {
            if let Some(msg) = queues.get_mut(&key).and_then(VecDeque::pop_front) {
                break msg;
            }
            if Instant::now() >= deadline {
                return Err(DecompError::CommTimeout {
                    neighbor: peer,
                    tag,
                    waited: self.timeout,
                });
            }
            self.mailbox.arrived.wait_until(&mut queues, deadline);
        };
        drop(queues);
        if msg.len() != buf.len() {
            return Err(DecompError::MessageLength {
                neighbor: peer,
                expected: buf.len(),
                actual: msg.len(),
            });
        }
        buf.copy_from_slice(&msg);
        Ok(())
    }

    fn abort(&self, code: i32) -> ! {
        log::error!("[rank {}] aborting with code {code}", self.rank);
        std::process::exit(code)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::point_to_point::Status;
    use mpi::request::{Request, Scope};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI world communicator. Immediate operations are polled against a
    /// deadline; when it expires the whole world is aborted.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        rank: usize,
        size: usize,
        timeout: Duration,
        // Dropped last: finalizes MPI.
        _universe: Universe,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, DecompError> {
            Self::with_timeout(ThreadComm::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, DecompError> {
            let universe = mpi::initialize().ok_or_else(|| DecompError::CommError {
                neighbor: 0,
                message: "MPI is already initialized".into(),
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                timeout,
                _universe: universe,
            })
        }

        fn complete_by<'a, D: ?Sized, S: Scope<'a>>(
            &self,
            mut req: Request<'a, D, S>,
            deadline: Instant,
            peer: usize,
            tag: u16,
        ) -> Status {
            loop {
                match req.test() {
                    Ok(status) => return status,
                    Err(pending) => req = pending,
                }
                if Instant::now() >= deadline {
                    let err = DecompError::CommTimeout {
                        neighbor: peer,
                        tag,
                        waited: self.timeout,
                    };
                    log::error!("[rank {}] {err}; aborting all workers", self.rank);
                    self.world.abort(TIMEOUT_EXIT_CODE);
                }
                std::thread::yield_now();
            }
        }

        fn check_count(
            &self,
            status: Status,
            peer: usize,
            expected: usize,
        ) -> Result<(), DecompError> {
            let actual = status.count(u8::equivalent_datatype()) as usize;
            if actual != expected {
                return Err(DecompError::MessageLength {
                    neighbor: peer,
                    expected,
                    actual,
                });
            }
            Ok(())
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn send(&self, peer: usize, tag: u16, buf: &[u8]) -> Result<(), DecompError> {
            check_peer(self.rank, peer, self.size)?;
            let process = self.world.process_at_rank(peer as i32);
            let deadline = Instant::now() + self.timeout;
            mpi::request::scope(|scope| {
                let req = process.immediate_send_with_tag(scope, buf, tag as i32);
                self.complete_by(req, deadline, peer, tag);
            });
            Ok(())
        }

        fn recv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Result<(), DecompError> {
            check_peer(self.rank, peer, self.size)?;
            let process = self.world.process_at_rank(peer as i32);
            let deadline = Instant::now() + self.timeout;
            let expected = buf.len();
            let status = mpi::request::scope(|scope| {
                let req = process.immediate_receive_into_with_tag(scope, buf, tag as i32);
                self.complete_by(req, deadline, peer, tag)
            });
            self.check_count(status, peer, expected)
        }

        fn sendrecv(
            &self,
            peer: usize,
            send_tag: u16,
            send: &[u8],
            recv_tag: u16,
            recv: &mut [u8],
        ) -> Result<(), DecompError> {
            check_peer(self.rank, peer, self.size)?;
            let process = self.world.process_at_rank(peer as i32);
            let deadline = Instant::now() + self.timeout;
            let expected = recv.len();
            let status = mpi::request::scope(|scope| {
                let rreq = process.immediate_receive_into_with_tag(scope, recv, recv_tag as i32);
                let sreq = process.immediate_send_with_tag(scope, send, send_tag as i32);
                let status = self.complete_by(rreq, deadline, peer, recv_tag);
                self.complete_by(sreq, deadline, peer, send_tag);
                status
            });
            self.check_count(status, peer, expected)
        }

        fn reduce_sum(&self, root: usize, value: f64) -> Result<Option<f64>, DecompError> {
            if root >= self.size {
                return Err(DecompError::RankOutOfRange {
                    rank: root,
                    nprocs: self.size,
                });
            }
            let root_process = self.world.process_at_rank(root as i32);
            if self.rank == root {
                let mut total = 0.0f64;
                root_process.reduce_into_root(&value, &mut total, SystemOperation::sum());
                Ok(Some(total))
            } else {
                root_process.reduce_into(&value, SystemOperation::sum());
                Ok(None)
            }
        }

        fn barrier(&self) -> Result<(), DecompError> {
            self.world.barrier();
            Ok(())
        }

        fn abort(&self, code: i32) -> ! {
            self.world.abort(code)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_roundtrip_two_ranks() {
        let world = ThreadComm::world(2, Duration::from_secs(5));
        world[0].send(1, 7, &[1, 2, 3, 4]).unwrap();
        let mut recv_buf = [0u8; 4];
        world[1].recv(0, 7, &mut recv_buf).unwrap();
        assert_eq!(recv_buf, [1, 2, 3, 4]);
    }

    #[test]
    fn missing_message_times_out() {
        let world = ThreadComm::world(2, Duration::from_millis(20));
        let mut buf = [0u8; 1];
        assert_eq!(
            world[0].recv(1, 9, &mut buf),
            Err(DecompError::CommTimeout {
                neighbor: 1,
                tag: 9,
                waited: Duration::from_millis(20)
            })
        );
    }

    #[test]
    fn length_mismatch_is_reported() {
        let world = ThreadComm::world(2, Duration::from_secs(5));
        world[1].send(0, 1, &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 2];
        assert!(matches!(
            world[0].recv(1, 1, &mut buf),
            Err(DecompError::MessageLength { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn no_comm_is_a_world_of_one() {
        let comm = NoComm;
        assert_eq!((comm.rank(), comm.size()), (0, 1));
        assert_eq!(comm.reduce_sum(0, 2.5), Ok(Some(2.5)));
        assert_eq!(comm.barrier(), Ok(()));
        assert!(comm.send(1, 0, &[]).is_err());
        assert!(comm.reduce_sum(1, 0.0).is_err());
    }

    #[test]
    fn tags_offset_without_overlap() {
        assert_eq!(HALO_TAG.offset(3).as_u16(), 0x4A03);
        assert_ne!(REDUCE_TAG.base(), BARRIER_TAG.offset(1).base());
    }
}
