//! Ghosted local arrays.
//!
//! A [`Field`] is one contiguous row-major buffer of
//! `(nxnom + 2) x (nynom + 2)` doubles: local row `i` runs along x, column
//! `j` along y, and `i * stride + j` addresses cell `(i, j)`. Row/column `0`
//! and `n + 1` form the ghost border. Boundary rows (West/East) are
//! contiguous and pack with a single copy; boundary columns are strided.
//!
//! [`LocalGrid`] bundles the three time levels a leapfrog worker needs.

use crate::debug_invariants::DebugInvariants;
use crate::decomp_error::DecompError;
use crate::topology::{Direction, LocalRegion};
use std::ops::{Index, IndexMut};

/// One ghosted scalar array.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    data: Vec<f64>,
    rows: usize,
    stride: usize,
}

impl Field {
    /// Zero field with `nxnom x nynom` interior cells.
    pub fn zeros(nxnom: usize, nynom: usize) -> Self {
        let rows = nxnom + 2;
        let stride = nynom + 2;
        Self {
            data: vec![0.0; rows * stride],
            rows,
            stride,
        }
    }

    pub fn for_region(region: &LocalRegion) -> Self {
        Self::zeros(region.nxnom, region.nynom)
    }

    /// Interior cells along x.
    #[inline]
    pub fn nxnom(&self) -> usize {
        self.rows - 2
    }

    /// Interior cells along y.
    #[inline]
    pub fn nynom(&self) -> usize {
        self.stride - 2
    }

    /// Ghosted extent `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.stride)
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(
            i < self.rows && j < self.stride,
            "index ({i}, {j}) out of bounds for {}x{} field",
            self.rows,
            self.stride
        );
        i * self.stride + j
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.offset(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        let k = self.offset(i, j);
        self.data[k] = value;
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Full local row `i`, ghost columns included.
    pub fn row(&self, i: usize) -> &[f64] {
        let start = self.offset(i, 0);
        &self.data[start..start + self.stride]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Set every interior cell from `f(i, j)` (local indices).
    pub fn fill_interior_with<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize) -> f64,
    {
        for i in 1..=self.nxnom() {
            for j in 1..=self.nynom() {
                self.set(i, j, f(i, j));
            }
        }
    }

    /// Sum over owned interior cells; ghosts duplicate neighbor data and are
    /// excluded.
    pub fn interior_sum(&self) -> f64 {
        (1..=self.nxnom())
            .map(|i| self.row(i)[1..=self.nynom()].iter().sum::<f64>())
            .sum()
    }

    /// Number of values in the ghost strip on side `dir` (corners excluded).
    pub fn strip_len(&self, dir: Direction) -> usize {
        match dir {
            Direction::West | Direction::East => self.nynom(),
            Direction::South | Direction::North => self.nxnom(),
        }
    }

    /// Copy the owned boundary strip next to side `dir` into `out`
    /// (cleared first). Only interior cells are read.
    pub fn pack_boundary(&self, dir: Direction, out: &mut Vec<f64>) {
        out.clear();
        let (nxnom, nynom) = (self.nxnom(), self.nynom());
        match dir {
            Direction::West => out.extend_from_slice(&self.row(1)[1..=nynom]),
            Direction::East => out.extend_from_slice(&self.row(nxnom)[1..=nynom]),
            Direction::South => out.extend((1..=nxnom).map(|i| self.get(i, 1))),
            Direction::North => out.extend((1..=nxnom).map(|i| self.get(i, nynom))),
        }
    }

    /// Write `buf` into the ghost strip on side `dir`. Interior cells are
    /// never touched.
    pub fn unpack_ghost(&mut self, dir: Direction, buf: &[f64]) -> Result<(), DecompError> {
        let expected = self.strip_len(dir);
        if buf.len() != expected {
            return Err(DecompError::HaloLength {
                expected,
                actual: buf.len(),
            });
        }
        let (nxnom, nynom) = (self.nxnom(), self.nynom());
        match dir {
            Direction::West | Direction::East => {
                let i = if dir == Direction::West { 0 } else { nxnom + 1 };
                let start = self.offset(i, 1);
                self.data[start..start + nynom].copy_from_slice(buf);
            }
            Direction::South | Direction::North => {
                let j = if dir == Direction::South { 0 } else { nynom + 1 };
                for (i, &v) in (1..=nxnom).zip(buf) {
                    self.set(i, j, v);
                }
            }
        }
        Ok(())
    }

    /// Set the full ghost row/column on side `dir`, corners included.
    pub fn fill_ghost_edge(&mut self, dir: Direction, value: f64) {
        let (rows, cols) = (self.rows, self.stride);
        match dir {
            Direction::West | Direction::East => {
                let i = if dir == Direction::West { 0 } else { rows - 1 };
                let start = self.offset(i, 0);
                self.data[start..start + cols].fill(value);
            }
            Direction::South | Direction::North => {
                let j = if dir == Direction::South { 0 } else { cols - 1 };
                for i in 0..rows {
                    self.set(i, j, value);
                }
            }
        }
    }
}

impl Index<(usize, usize)> for Field {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[self.offset(i, j)]
    }
}

impl IndexMut<(usize, usize)> for Field {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        let k = self.offset(i, j);
        &mut self.data[k]
    }
}

/// The three time levels of one worker plus the region they cover.
///
/// Allocated once; [`LocalGrid::rotate`] relabels the buffers each step
/// without copying.
#[derive(Clone, Debug)]
pub struct LocalGrid {
    region: LocalRegion,
    previous: Field,
    current: Field,
    next: Field,
}

impl LocalGrid {
    pub fn new(region: LocalRegion) -> Self {
        let grid = Self {
            previous: Field::for_region(&region),
            current: Field::for_region(&region),
            next: Field::for_region(&region),
            region,
        };
        crate::debug_invariants!(grid.validate_invariants(), "LocalGrid");
        grid
    }

    pub fn region(&self) -> &LocalRegion {
        &self.region
    }

    pub fn previous(&self) -> &Field {
        &self.previous
    }

    pub fn current(&self) -> &Field {
        &self.current
    }

    pub fn next(&self) -> &Field {
        &self.next
    }

    pub fn previous_mut(&mut self) -> &mut Field {
        &mut self.previous
    }

    pub fn current_mut(&mut self) -> &mut Field {
        &mut self.current
    }

    /// Disjoint borrows of `(previous, current, next)`.
    pub fn levels_mut(&mut self) -> (&mut Field, &mut Field, &mut Field) {
        (&mut self.previous, &mut self.current, &mut self.next)
    }

    /// `previous <- current <- next <- previous`.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Owned values of the current level as `(gi, gj, value)` in global
    /// 1-based indices.
    pub fn owned_values(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let (nxnom, nynom) = (self.region.nxnom, self.region.nynom);
        (1..=nxnom).flat_map(move |i| {
            (1..=nynom).map(move |j| {
                let (gi, gj) = self.region.to_global(i, j);
                (gi, gj, self.current.get(i, j))
            })
        })
    }
}

impl DebugInvariants for LocalGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "LocalGrid");
    }

    fn validate_invariants(&self) -> Result<(), DecompError> {
        let want = (self.region.local_size_x(), self.region.local_size_y());
        for field in [&self.previous, &self.current, &self.next] {
            if field.shape() != want || field.data.len() != want.0 * want.1 {
                return Err(DecompError::HaloLength {
                    expected: want.0 * want.1,
                    actual: field.data.len(),
                });
            }
        }
        Ok(())
    }
}
