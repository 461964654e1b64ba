use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use infarct_common::{snapshot_path, SimulationConfig, ThreeStateRunConfig};
use infarct_engine::output::{save_archive, write_final_csv, write_three_state_csv};
use infarct_engine::{run_three_state, InfarctSimulation, Solver};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Micro-infarct propagation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the 2-D cell-death propagation over the tissue grid.
    Propagate {
        /// TOML configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Solve the single-compartment alive/vulnerable/dead model and write its trajectory.
    ThreeState {
        /// TOML configuration file; only `[three_state]`, `[solver]` and `[output]` are read
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Output CSV (defaults to `<base_filename>_three_state.csv`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Propagate { config } => propagate(config),
        Command::ThreeState { config, output } => three_state(config, output),
    }
}

fn propagate(config_path: PathBuf) -> Result<()> {
    info!("Starting Infarct Engine (CPU Parallel)...");

    // --- Load Configuration ---
    let config = SimulationConfig::load(&config_path)?;
    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = InfarctSimulation::new(config)?;
    debug!("Simulation Parameters: {:#?}", sim.params());

    // --- Simulation Loop ---
    sim.run()?;

    let last = sim.recorded_snapshots().last().map(|s| s.stats).unwrap_or_default();
    info!(
        "Final state: mean infarct {:.4}, max infarct {:.4}, {} sites at least half dead.",
        last.mean_infarct, last.max_infarct, last.dead_sites
    );

    // --- Save Recorded Data ---
    info!("Saving recorded data...");
    let output = sim.config().output.clone();
    if output.save_final_csv {
        let path = PathBuf::from(format!("{}_final.csv", output.base_filename));
        write_final_csv(&path, &sim.grid(), sim.perfusion(), sim.infarct(), sim.toxin())?;
    } else {
        info!("Skipping final CSV as per config.");
    }

    let archive = sim.into_archive();
    save_archive(&archive, &snapshot_path(&output.base_filename, output.format), output.format)?;

    info!("Simulation Complete.");
    Ok(())
}

fn three_state(config_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let config = ThreeStateRunConfig::load(&config_path)?;
    let model = config.model();

    let solver = Solver::from_config(&config.solver);
    info!(
        "Solving three-state model over {:.1} days ({} samples, solver {}).",
        model.duration_s / 86_400.0,
        model.num_samples,
        solver.name()
    );

    let start_time = Instant::now();
    let samples = run_three_state(&model, &solver).context("Three-state model failed")?;
    info!("Solved in {:.3} seconds.", start_time.elapsed().as_secs_f64());

    if let Some(last) = samples.last() {
        info!(
            "Day {:.2}: alive {:.4}, vulnerable {:.4}, dead {:.4}, blockage {:.4}.",
            last.time_day, last.alive, last.vulnerable, last.dead, last.blockage
        );
    }

    let path = output.unwrap_or_else(|| PathBuf::from(format!("{}_three_state.csv", config.base_filename())));
    write_three_state_csv(&path, &samples)
}
