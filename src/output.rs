//! Writing run results to disk: snapshot archives and CSV tables.

use crate::grid::Grid;
use crate::three_state::ThreeStateSample;
use anyhow::{Context, Result};
use infarct_common::{write_archive, OutputFormat, SnapshotArchive};
use log::info;
use std::path::Path;

/// Writes the archive and logs where it went.
pub fn save_archive(archive: &SnapshotArchive, path: &Path, format: OutputFormat) -> Result<()> {
    write_archive(archive, path, format)?;
    info!(
        "{} snapshots saved to {} ({:?} format)",
        archive.snapshots.len(),
        path.display(),
        format
    );
    Ok(())
}

/// One row per site: `i,j,perfusion,infarct,toxin`.
pub fn write_final_csv(
    path: &Path,
    grid: &Grid,
    perfusion: &[f64],
    infarct: &[f64],
    toxin: &[f64],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;
    writer.write_record(["i", "j", "perfusion", "infarct", "toxin"])?;
    for idx in 0..grid.num_sites() {
        let (i, j) = grid.coords(idx);
        writer.write_record(&[
            i.to_string(),
            j.to_string(),
            format!("{:.6}", perfusion[idx]),
            format!("{:.8}", infarct[idx]),
            format!("{:.8}", toxin[idx]),
        ])?;
    }
    writer.flush()?;
    info!("Final fields saved to {}", path.display());
    Ok(())
}

pub fn write_three_state_csv(path: &Path, samples: &[ThreeStateSample]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    info!("{} three-state samples saved to {}", samples.len(), path.display());
    Ok(())
}
