//! Relative perfusion field: the initial occlusion pattern and the reperfusion transform.

use crate::grid::Grid;
use infarct_common::PerfusionRegion;

/// Fully perfused field (1.0) with each region painted over it in order,
/// so a later, smaller region carves a deeper core into an earlier one.
pub fn build_perfusion_field(grid: &Grid, regions: &[PerfusionRegion]) -> Vec<f64> {
    let mut field = vec![1.0; grid.num_sites()];
    for region in regions {
        let i_end = region.i_end.min(grid.nx);
        let j_end = region.j_end.min(grid.ny);
        for i in region.i_start..i_end {
            let row = grid.idx(i, 0);
            field[row + region.j_start.min(j_end)..row + j_end].fill(region.value);
        }
    }
    field
}

/// Partial reperfusion: every site moves `recovery_fraction` of the way towards full flow.
pub fn apply_recovery(field: &mut [f64], recovery_fraction: f64) {
    for perf in field.iter_mut() {
        *perf += recovery_fraction * (1.0 - *perf);
    }
}

/// Number of sites with reduced perfusion, i.e. sites the death model is run on.
pub fn hypoperfused_sites(field: &[f64]) -> usize {
    field.iter().filter(|&&p| p < 1.0).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lo: usize, hi: usize, value: f64) -> PerfusionRegion {
        PerfusionRegion { i_start: lo, i_end: hi, j_start: lo, j_end: hi, value }
    }

    #[test]
    fn nested_regions_paint_in_order() {
        let grid = Grid::new(10, 10);
        let field = build_perfusion_field(&grid, &[block(2, 8, 0.3), block(4, 6, 0.0)]);
        assert_eq!(field[grid.idx(0, 0)], 1.0);
        assert_eq!(field[grid.idx(2, 2)], 0.3);
        assert_eq!(field[grid.idx(7, 3)], 0.3);
        assert_eq!(field[grid.idx(8, 8)], 1.0);
        assert_eq!(field[grid.idx(4, 5)], 0.0);
        assert_eq!(field[grid.idx(6, 6)], 0.3);
        assert_eq!(hypoperfused_sites(&field), 36);
    }

    #[test]
    fn rectangular_region_respects_both_axes() {
        let grid = Grid::new(6, 8);
        let region = PerfusionRegion { i_start: 1, i_end: 3, j_start: 4, j_end: 7, value: 0.5 };
        let field = build_perfusion_field(&grid, &[region]);
        assert_eq!(hypoperfused_sites(&field), 6);
        assert_eq!(field[grid.idx(1, 4)], 0.5);
        assert_eq!(field[grid.idx(2, 6)], 0.5);
        assert_eq!(field[grid.idx(2, 7)], 1.0);
        assert_eq!(field[grid.idx(3, 4)], 1.0);
    }

    #[test]
    fn recovery_moves_towards_full_flow() {
        let mut field = vec![0.5, 0.0, 1.0, 0.3];
        apply_recovery(&mut field, 0.8);
        assert!((field[0] - 0.9).abs() < 1e-12);
        assert!((field[1] - 0.8).abs() < 1e-12);
        assert_eq!(field[2], 1.0);
        assert!((field[3] - 0.86).abs() < 1e-12);
    }

    #[test]
    fn zero_recovery_is_identity() {
        let mut field = vec![0.1, 0.7];
        apply_recovery(&mut field, 0.0);
        assert_eq!(field, vec![0.1, 0.7]);
    }
}
