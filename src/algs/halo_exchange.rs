//! Nearest-neighbor ghost exchange.
//!
//! For every side with a neighbor, the owned boundary strip is packed, sent,
//! and the neighbor's strip is received into the ghost strip on that side.
//! Sides without a neighbor are physical edges and are skipped. Each
//! direction completes (send and receive) before its pack buffer is reused,
//! and [`HaloExchanger::exchange`] only returns once every ghost strip has
//! been written.

use crate::algs::communicator::{CommTag, Communicator, HALO_TAG};
use crate::data::local_grid::Field;
use crate::decomp_error::DecompError;
use crate::topology::{Direction, EdgeSet, LocalRegion, NeighborTable};
use bytemuck::{cast_slice, cast_slice_mut};

/// Reusable pack/unpack buffers for halo traffic of one worker.
#[derive(Clone, Debug)]
pub struct HaloExchanger {
    tag: CommTag,
    send_buf: Vec<f64>,
    recv_buf: Vec<f64>,
}

impl Default for HaloExchanger {
    fn default() -> Self {
        Self::with_tag(HALO_TAG)
    }
}

impl HaloExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different tag range, e.g. to run two exchangers side by side.
    pub fn with_tag(tag: CommTag) -> Self {
        Self {
            tag,
            send_buf: Vec::new(),
            recv_buf: Vec::new(),
        }
    }

    /// Tag of a message travelling towards side `dir` of its sender.
    fn tag_towards(&self, dir: Direction) -> u16 {
        self.tag.offset(dir.index() as u16).as_u16()
    }

    /// Exchange every communication boundary of `region`.
    pub fn exchange<C>(
        &mut self,
        field: &mut Field,
        region: &LocalRegion,
        comm: &C,
    ) -> Result<(), DecompError>
    where
        C: Communicator + ?Sized,
    {
        self.exchange_directions(field, &region.neighbors, EdgeSet::ALL, comm)
    }

    /// Exchange the sides in `directions` that have a neighbor.
    ///
    /// Both sides of a pair must request the matching directions, otherwise
    /// the receive runs into the communicator's timeout.
    pub fn exchange_directions<C>(
        &mut self,
        field: &mut Field,
        neighbors: &NeighborTable,
        directions: EdgeSet,
        comm: &C,
    ) -> Result<(), DecompError>
    where
        C: Communicator + ?Sized,
    {
        for (dir, nbr) in neighbors.iter() {
            if !directions.contains(dir) {
                continue;
            }
            field.pack_boundary(dir, &mut self.send_buf);
            self.recv_buf.clear();
            self.recv_buf.resize(field.strip_len(dir), 0.0);
            comm.sendrecv(
                nbr,
                self.tag_towards(dir),
                cast_slice(&self.send_buf),
                self.tag_towards(dir.opposite()),
                cast_slice_mut(&mut self.recv_buf),
            )?;
            field.unpack_ghost(dir, &self.recv_buf)?;
            log::trace!(
                "[rank {}] halo {:?} <-> rank {} ({} values)",
                comm.rank(),
                dir,
                nbr,
                self.recv_buf.len()
            );
        }
        Ok(())
    }
}
