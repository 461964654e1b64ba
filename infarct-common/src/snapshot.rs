use serde::{Serialize, Deserialize};

/// Summary statistics over a whole field pair, for quick inspection without the raw arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean_infarct: f64,
    pub max_infarct: f64,
    pub mean_toxin: f64,
    pub max_toxin: f64,
    /// Number of sites whose dead fraction is at least one half.
    pub dead_sites: u32,
}

impl FieldStats {
    pub fn from_fields(infarct: &[f64], toxin: &[f64]) -> Self {
        let n = infarct.len().max(1) as f64;
        FieldStats {
            mean_infarct: infarct.iter().sum::<f64>() / n,
            max_infarct: infarct.iter().copied().fold(0.0, f64::max),
            mean_toxin: toxin.iter().sum::<f64>() / toxin.len().max(1) as f64,
            max_toxin: toxin.iter().copied().fold(0.0, f64::max),
            dead_sites: infarct.iter().filter(|&&d| d >= 0.5).count() as u32,
        }
    }
}

/// A snapshot of the tissue fields at the end of an outer iteration.
#[derive(Debug, Clone, Serialize, Deserialize)] // Derive traits for easy saving/loading
pub struct FieldSnapshot {
    /// Number of completed outer iterations (0 = initial state).
    pub iteration: u32,
    /// The simulation time (in minutes) at which the snapshot was taken.
    pub time_min: f64,
    /// Dead fraction per site, row-major (`i * ny + j`).
    pub infarct: Vec<f64>,
    /// Toxin level per site, row-major.
    pub toxin: Vec<f64>,
    /// Present only when the run was configured to store perfusion per snapshot.
    #[serde(default)]
    pub perfusion: Option<Vec<f64>>,
    pub stats: FieldStats,
}

/// Everything a downstream renderer needs to interpret a run's snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotArchive {
    pub nx: usize,
    pub ny: usize,
    pub outer_step_min: f64,
    pub snapshots: Vec<FieldSnapshot>,
}
