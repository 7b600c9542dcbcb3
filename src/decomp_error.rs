//! DecompError: Unified error type for halo-wave public APIs
//!
//! Every fallible operation in the decomposition core returns this type.
//! Configuration errors are deterministic (all workers compute the same
//! partition), so every rank observes the same variant and the caller can
//! abort the whole world without split-brain reporting.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Axis of the global grid / worker grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("x"),
            Axis::Y => f.write_str("y"),
        }
    }
}

/// Unified error type for halo-wave operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecompError {
    /// The global grid has no points along one axis.
    #[error("global domain must have nx, ny > 0 (got nx={nx}, ny={ny})")]
    EmptyDomain { nx: usize, ny: usize },
    /// Zero workers requested.
    #[error("worker count must be non-zero")]
    NoWorkers,
    /// The partition heuristic assigned no workers to an axis.
    #[error(
        "could not (nicely) divide the work: 0 workers along {axis} \
         (nprocs={nprocs}, nx={nx}, ny={ny})"
    )]
    ZeroWorkers {
        axis: Axis,
        nprocs: usize,
        nx: usize,
        ny: usize,
    },
    /// The worker grid shape does not multiply out to the worker count.
    #[error("worker grid {nxprocs}x{nyprocs} does not cover {nprocs} workers")]
    NotFactorable {
        nprocs: usize,
        nxprocs: usize,
        nyprocs: usize,
    },
    /// Points along an axis do not split evenly among that axis' workers.
    #[error("cannot split {points} points along {axis} evenly among {workers} workers")]
    UnevenSplit {
        axis: Axis,
        points: usize,
        workers: usize,
    },
    /// A rank outside `0..nprocs` was used.
    #[error("rank {rank} is out of range for {nprocs} workers")]
    RankOutOfRange { rank: usize, nprocs: usize },
    /// The communicator and the topology disagree on the world size.
    #[error("communicator has {actual} ranks but the topology expects {expected}")]
    WorldSizeMismatch { expected: usize, actual: usize },
    /// Transport-level failure talking to a neighbor.
    #[error("communication error with rank {neighbor}: {message}")]
    CommError { neighbor: usize, message: String },
    /// A bounded wait on a neighbor expired.
    #[error("timed out after {waited:?} waiting for rank {neighbor} (tag {tag:#06x})")]
    CommTimeout {
        neighbor: usize,
        tag: u16,
        waited: Duration,
    },
    /// A received message had an unexpected byte length.
    #[error("rank {neighbor} sent {actual} bytes, expected {expected}")]
    MessageLength {
        neighbor: usize,
        expected: usize,
        actual: usize,
    },
    /// A halo buffer does not match the ghost row/column it is written into.
    #[error("halo buffer holds {actual} values, ghost strip needs {expected}")]
    HaloLength { expected: usize, actual: usize },
    /// Malformed numeric input or configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DecompError {
    /// True for errors that stem from the run configuration rather than the
    /// transport; these are reported once on the root rank.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DecompError::EmptyDomain { .. }
                | DecompError::NoWorkers
                | DecompError::ZeroWorkers { .. }
                | DecompError::NotFactorable { .. }
                | DecompError::UnevenSplit { .. }
                | DecompError::WorldSizeMismatch { .. }
                | DecompError::InvalidConfig(_)
        )
    }
}
