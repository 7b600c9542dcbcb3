//! Neighbor directions and the per-rank neighbor table.
//!
//! Directions are named after the side of the local block they refer to:
//! `West`/`East` are the low/high `x` sides (local row `0` / `nxnom + 1`),
//! `South`/`North` the low/high `y` sides (local column `0` / `nynom + 1`).

use crate::decomp_error::Axis;

/// One side of a worker's block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    West,
    East,
    South,
    North,
}

impl Direction {
    /// Exchange order: x sides first (contiguous rows), then y sides.
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::West | Direction::East => Axis::X,
            Direction::South | Direction::North => Axis::Y,
        }
    }

    /// Dense index, stable across runs (used for tables and message tags).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Neighbor rank in each direction; `None` marks a physical edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborTable {
    ranks: [Option<usize>; 4],
}

impl NeighborTable {
    pub fn new(
        west: Option<usize>,
        east: Option<usize>,
        south: Option<usize>,
        north: Option<usize>,
    ) -> Self {
        Self {
            ranks: [west, east, south, north],
        }
    }

    #[inline]
    pub fn get(&self, dir: Direction) -> Option<usize> {
        self.ranks[dir.index()]
    }

    /// Communication boundaries: `(direction, neighbor rank)` in exchange order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(|r| (d, r)))
    }

    /// Sides with no neighbor, i.e. the physical edges this worker owns.
    pub fn physical_edges(&self) -> EdgeSet {
        let mut edges = EdgeSet::default();
        for d in Direction::ALL {
            if self.get(d).is_none() {
                edges.insert(d);
            }
        }
        edges
    }
}

/// Small set of directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeSet {
    bits: u8,
}

impl EdgeSet {
    pub const ALL: EdgeSet = EdgeSet { bits: 0b1111 };

    pub fn insert(&mut self, dir: Direction) {
        self.bits |= 1 << dir.index();
    }

    pub fn contains(&self, dir: Direction) -> bool {
        self.bits & (1 << dir.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Direction> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = EdgeSet::default();
        for d in iter {
            set.insert(d);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
            assert_eq!(d.opposite().axis(), d.axis());
        }
    }

    #[test]
    fn physical_edges_are_missing_neighbors() {
        let t = NeighborTable::new(None, Some(3), Some(0), None);
        let edges = t.physical_edges();
        assert!(edges.contains(Direction::West));
        assert!(edges.contains(Direction::North));
        assert!(!edges.contains(Direction::East));
        assert_eq!(
            t.iter().collect::<Vec<_>>(),
            vec![(Direction::East, 3), (Direction::South, 0)]
        );
    }

    #[test]
    fn edge_set_collects() {
        let s: EdgeSet = [Direction::South, Direction::South].into_iter().collect();
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![Direction::South]);
        assert!(EdgeSet::default().is_empty());
        assert_eq!(EdgeSet::ALL.iter().count(), 4);
    }
}
