use std::ops::Range;

/// Uniform `nx` x `ny` tissue lattice. Fields are stored row-major, site `(i, j)` at `i * ny + j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
}

impl Grid {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { nx, ny }
    }

    #[inline(always)]
    pub fn num_sites(&self) -> usize {
        self.nx * self.ny
    }

    // Calculates the 1D field index for a site
    #[inline(always)]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    #[inline(always)]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.ny, idx % self.ny)
    }

    /// Sites on the outermost ring. Diffusion never updates them.
    #[inline(always)]
    pub fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i + 1 >= self.nx || j + 1 >= self.ny
    }

    /// Row indices that have a neighbour on both sides (empty for grids thinner than 3).
    pub fn interior_rows(&self) -> Range<usize> {
        1..self.nx.saturating_sub(1).max(1)
    }

    /// Column indices that have a neighbour on both sides.
    pub fn interior_cols(&self) -> Range<usize> {
        1..self.ny.saturating_sub(1).max(1)
    }

    /// A zero-filled field shaped for this grid.
    pub fn zeros(&self) -> Vec<f64> {
        vec![0.0; self.num_sites()]
    }
}
