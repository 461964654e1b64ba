//! Explicit 5-point finite-difference diffusion of the toxin field.
//!
//! `new(i,j) = old(i,j) + Co * (old(i+1,j) + old(i-1,j) + old(i,j+1) + old(i,j-1) - 4 old(i,j))`
//!
//! Interior sites read only the previous field, so the update is free of sweep-order bias.
//! The outer ring is copied through unchanged. Stable for `0 <= Co <= 0.25`.

use crate::grid::Grid;
use rayon::prelude::*;

/// Writes one diffusion step of `toxin` into `out`. Rows are processed in parallel.
pub fn diffuse(grid: &Grid, toxin: &[f64], out: &mut [f64], co: f64) {
    let ny = grid.ny;
    if ny == 0 {
        return;
    }
    let nx = grid.nx;

    out.par_chunks_mut(ny).enumerate().for_each(|(i, row_out)| {
        let row = i * ny;
        if i == 0 || i + 1 >= nx {
            row_out.copy_from_slice(&toxin[row..row + ny]);
            return;
        }
        for j in 0..ny {
            let c = row + j;
            row_out[j] = if grid.is_boundary(i, j) {
                toxin[c]
            } else {
                toxin[c] + co * (toxin[c + ny] + toxin[c - ny] + toxin[c + 1] + toxin[c - 1] - 4.0 * toxin[c])
            };
        }
    });
}

/// Sum of the field over interior sites.
pub fn interior_sum(grid: &Grid, field: &[f64]) -> f64 {
    grid.interior_rows()
        .flat_map(|i| grid.interior_cols().map(move |j| (i, j)))
        .map(|(i, j)| field[grid.idx(i, j)])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(grid: &Grid, field: &[f64], co: f64) -> Vec<f64> {
        let mut out = grid.zeros();
        diffuse(grid, field, &mut out, co);
        out
    }

    #[test]
    fn uniform_field_is_steady() {
        let grid = Grid::new(6, 5);
        let field = vec![0.4; grid.num_sites()];
        let out = step(&grid, &field, 0.25);
        for v in out {
            assert!((v - 0.4).abs() < 1e-15);
        }
    }

    #[test]
    fn spike_spreads_symmetrically() {
        let grid = Grid::new(7, 7);
        let mut field = grid.zeros();
        field[grid.idx(3, 3)] = 1.0;
        let out = step(&grid, &field, 0.2);

        assert!((out[grid.idx(3, 3)] - 0.2).abs() < 1e-15);
        for (i, j) in [(2, 3), (4, 3), (3, 2), (3, 4)] {
            assert!((out[grid.idx(i, j)] - 0.2).abs() < 1e-15, "({i},{j})");
        }
        assert_eq!(out[grid.idx(2, 2)], 0.0);
    }

    #[test]
    fn boundary_keeps_previous_values() {
        let grid = Grid::new(5, 5);
        let mut field = grid.zeros();
        for j in 0..5 {
            field[grid.idx(0, j)] = 0.7;
            field[grid.idx(4, j)] = 0.1;
        }
        field[grid.idx(2, 0)] = 0.9;
        let out = step(&grid, &field, 0.25);
        for j in 0..5 {
            assert_eq!(out[grid.idx(0, j)], 0.7);
            assert_eq!(out[grid.idx(4, j)], 0.1);
        }
        assert_eq!(out[grid.idx(2, 0)], 0.9);
        // Interior neighbours of the boundary do feel it.
        assert!(out[grid.idx(1, 2)] > 0.0);
    }

    #[test]
    fn interior_mass_conserved_away_from_boundary() {
        let grid = Grid::new(20, 20);
        let mut field = grid.zeros();
        field[grid.idx(10, 10)] = 1.0;
        field[grid.idx(9, 11)] = 0.5;
        let before = interior_sum(&grid, &field);

        let mut current = field;
        for _ in 0..3 {
            current = step(&grid, &current, 0.25);
        }
        let after = interior_sum(&grid, &current);
        assert!((before - after).abs() < 1e-12, "before={before} after={after}");
    }

    #[test]
    fn max_coefficient_stays_bounded() {
        let grid = Grid::new(15, 15);
        // Checkerboard is the mode most prone to explicit-scheme blow-up.
        let mut current: Vec<f64> = (0..grid.num_sites())
            .map(|idx| {
                let (i, j) = grid.coords(idx);
                if (i + j) % 2 == 0 { 1.0 } else { 0.0 }
            })
            .collect();
        for _ in 0..500 {
            current = step(&grid, &current, 0.25);
            assert!(current.iter().all(|&v| (-1e-12..=1.0 + 1e-12).contains(&v)));
        }
    }

    #[test]
    fn zero_coefficient_is_identity() {
        let grid = Grid::new(4, 4);
        let field: Vec<f64> = (0..16).map(|k| k as f64 / 16.0).collect();
        assert_eq!(step(&grid, &field, 0.0), field);
    }
}
