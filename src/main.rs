use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

mod binning;
mod deviation;
mod layout;
mod output;
mod physics;
mod report;
mod scheduler;
mod simulation;

use galton_common::{FormValues, SimulationConfig};
use physics::SimpleWorld;
use report::{DeviationReadout, HistogramTable, SpawnCounter};
use simulation::SimulationState;

/// Command-line arguments for the engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run configuration (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Parameter form submission (TOML) applied through the form update path
    #[arg(long)]
    form: Option<PathBuf>,

    /// Seed for spawn jitter, overriding the config
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Galton board engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.spawn.seed = Some(seed);
    }
    debug!("Configuration: {:#?}", config);

    // --- Initialize Simulation ---
    let world = SimpleWorld::new(config.world.gravity_y);
    let mut sim = SimulationState::new(config, world)?;

    if let Some(form_path) = &args.form {
        let form_str = std::fs::read_to_string(form_path)
            .with_context(|| format!("reading form file '{}'", form_path.display()))?;
        let form = FormValues::from_toml_str(&form_str, &form_path.display().to_string())?;
        sim.apply_form(&form)?;
    }

    if sim.config().spawn.autostart {
        sim.start_spawning();
    }

    // --- Simulation Loop ---
    let dt = sim.config().physics_dt();
    let total_steps = (sim.config().timing.total_time_s / (sim.config().timing.physics_dt_ms / 1000.0)).ceil() as u32;
    let mut record_interval_steps = (sim.config().timing.record_interval_ms / sim.config().timing.physics_dt_ms).round() as u32;
    if record_interval_steps == 0 {
        warn!(
            "Record interval ({:.2} ms) is smaller than physics timestep ({:.2} ms). Recording every physics step.",
            sim.config().timing.record_interval_ms,
            sim.config().timing.physics_dt_ms
        );
        record_interval_steps = 1;
    }
    info!(
        "Running {} steps of {:.2} ms, recording every {} steps.",
        total_steps,
        dt.as_secs_f64() * 1000.0,
        record_interval_steps
    );

    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    sim.record_snapshot();

    let mut last_report = sim.report();
    for step in 0..total_steps {
        last_report = sim.step(dt);

        let now = Instant::now();
        let should_print_status = now.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "Step [{}/{}] ({:.2} s) | {} | Collected: {} | Pending: {} | {}",
                step + 1,
                total_steps,
                sim.elapsed().as_secs_f64(),
                SpawnCounter(sim.spawned()),
                last_report.histogram.total(),
                last_report.histogram.pending(),
                DeviationReadout(last_report.deviation)
            );
            previous_print_time = now;

            if is_record_step || is_last_step {
                sim.record_snapshot();
            }
        } else {
            trace!("Step [{}/{}] completed.", step + 1, total_steps);
        }
    }

    info!(
        "Simulation finished in {:.3} seconds of wall time.",
        start_time.elapsed().as_secs_f64()
    );
    println!("{}", HistogramTable::new(last_report.histogram.counts()));
    println!("{}", DeviationReadout(last_report.deviation));
    println!("{}", SpawnCounter(sim.spawned()));
    debug!("Spawn cap: {} of {} used.", sim.spawned(), sim.scheduler().cap());

    // --- Save Recorded Data ---
    let output_config = sim.config().output.clone();
    if output_config.save_stats {
        if let Err(e) = output::write_snapshots(&output_config, sim.recorded_snapshots()) {
            error!("Error saving snapshots: {:#}", e);
            return Err(e);
        }
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }

    if output_config.save_histogram {
        let counts = last_report.histogram.counts();
        let expected = deviation::expected_counts(counts.len(), u64::from(last_report.histogram.total()));
        let path = PathBuf::from(format!("{}_histogram.csv", output_config.base_filename));
        output::write_histogram_csv(&path, sim.layout(), counts, &expected)?;
    }

    if output_config.save_positions {
        let path = PathBuf::from(format!("{}_final_positions.csv", output_config.base_filename));
        output::write_positions_csv(&path, &sim.particle_positions())?;
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
