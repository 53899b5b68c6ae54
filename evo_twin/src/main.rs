//! # EVO Twin Binary
//!
//! Runs the moves of a machine file through the simulation pipeline and
//! reports every step.
//!
//! # Usage
//!
//! ```bash
//! # Simulate with default solver/learning configuration
//! evo_twin machines/trunnion.toml
//!
//! # Custom configuration, persisted profiles, table at Z = -250
//! evo_twin machines/trunnion.toml --config twin.toml --profiles /var/lib/evo/profiles --table-height -250
//!
//! # Step results as JSON lines
//! evo_twin machines/trunnion.toml --json
//! ```

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use evo_twin::dynamics::JsonProfileStore;
use evo_twin::kinematics::ModelRegistry;
use evo_twin::orchestrator::{Collaborators, SimulationHub, TablePlaneDetector};
use evo_twin_common::config::{ConfigLoader, LogLevel, MachineFile, TwinConfig};

/// EVO Twin - machine-tool digital twin simulator
#[derive(Parser, Debug)]
#[command(name = "evo_twin")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Kinematics, axis dynamics and contact simulation for CNC machines")]
#[command(long_about = None)]
struct Args {
    /// Machine file (model definition + move list).
    #[arg(value_name = "MACHINE")]
    machine: PathBuf,

    /// Simulator configuration (solver, learning, safety, logging).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for learned axis profiles. Profiles are kept in memory if absent.
    #[arg(short, long, value_name = "DIR")]
    profiles: Option<PathBuf>,

    /// Report tool/table contact below this Z height [mm].
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    table_height: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and step results in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Simulation failed: {}", e);
        eprintln!("evo_twin: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TwinConfig::load(path),
        None => Ok(TwinConfig::default()),
    };
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);
    let config = config?;
    config.validate()?;

    info!("EVO Twin v{} starting...", env!("CARGO_PKG_VERSION"));

    let machine = MachineFile::load(&args.machine)?;
    info!(
        "Loaded machine '{}' with {} moves from {}",
        machine.machine_id,
        machine.moves.len(),
        args.machine.display()
    );

    let mut hub = SimulationHub::new(config, ModelRegistry::new());
    let model = hub.registry_mut().load(&machine.model)?;

    let mut collaborators = Collaborators::default();
    if let Some(dir) = &args.profiles {
        info!("Persisting profiles in {}", dir.display());
        collaborators = collaborators.with_store(JsonProfileStore::new(dir));
    }
    if let Some(height) = args.table_height {
        collaborators = collaborators.with_detector(TablePlaneDetector::new(height));
    }
    hub.add_machine_with_model(&machine.machine_id, model, collaborators)?;

    let mut failed = 0usize;
    for (idx, mv) in machine.moves.iter().enumerate() {
        let command = mv.to_command()?;
        let result = hub.execute_move(&machine.machine_id, &command)?;

        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            info!(
                "Move {}: success={} predicted={:.3}s joints={:?}",
                idx + 1,
                result.success,
                result.predicted_time,
                &result.final_joints[..]
            );
        }
        for warning in &result.warnings {
            warn!("Move {}: {}", idx + 1, warning);
        }
        if result.flags().has_blocking() {
            failed += 1;
        }
    }

    if failed > 0 {
        warn!("{failed} moves ended with blocking warnings");
    }
    info!("EVO Twin finished");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
