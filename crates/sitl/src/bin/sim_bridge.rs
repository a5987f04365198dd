//! Drive a JSON physics backend with constant actuator output.
//!
//! Loads backend parameters from a JSON configuration file, then runs
//! lockstep exchanges and logs the returned telemetry. Useful for checking a
//! simulator setup end to end before attaching a real control loop.
//!
//! Usage:
//!   cargo run -p simlink_sitl --bin sim_bridge -- [OPTIONS]
//!
//! Pair with the built-in peer:
//!   cargo run -p simlink_sitl --bin mock_physics -- --bind 127.0.0.1:9002

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info, warn};
use simlink_core::parameters::DEFAULT_SECTION;
use simlink_core::{BackendParams, ConfigStore};
use simlink_sitl::{ActuatorCommands, JsonBackend, PhysicsBackend};

#[derive(Parser)]
#[command(name = "sim_bridge")]
#[command(about = "Exchange control frames with a JSON physics simulator")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration section holding the backend parameters
    #[arg(long, default_value = DEFAULT_SECTION)]
    section: String,

    /// Frame rate reported to the simulator (Hz)
    #[arg(long, default_value = "50")]
    rate: u16,

    /// Number of frames to run (0 = until the backend faults)
    #[arg(short = 'n', long, default_value = "100")]
    frames: u32,

    /// Normalized output applied to every channel (-1.0 to 1.0)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    throttle: f64,

    /// Override the simulator port from the configuration
    #[arg(long)]
    port: Option<u16>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ConfigStore::load(path)?
        }
        None => ConfigStore::new(),
    };
    if let Some(port) = args.port {
        store.set_num(&args.section, "port", f64::from(port));
    }

    let params = BackendParams::from_store(&store, &args.section);
    info!(
        "Simulator {}:{} (telem_timeout {:.3}s, poll {:.3}s, decode_policy {})",
        params.addr,
        params.port,
        params.telem_timeout,
        params.receive_timeout,
        params.decode_policy.name()
    );
    if !params.is_valid() {
        warn!("{}.addr '{}' is not an IPv4 address", args.section, params.addr);
    }

    let mut backend = JsonBackend::try_new(args.section.clone(), params)?;
    backend.set_frame_rate(args.rate);

    let commands = ActuatorCommands::uniform(args.throttle);
    let mut received = 0u64;
    let mut attempts = 0u64;

    while args.frames == 0 || attempts < u64::from(args.frames) {
        attempts += 1;
        match backend.exchange(&commands) {
            Ok(record) => {
                received += 1;
                info!(
                    "frame {} t={:.3}s pos=[{:.2}, {:.2}, {:.2}] vel=[{:.2}, {:.2}, {:.2}]",
                    backend.frame_count(),
                    record.timestamp,
                    record.position[0],
                    record.position[1],
                    record.position[2],
                    record.velocity[0],
                    record.velocity[1],
                    record.velocity[2]
                );
            }
            Err(e) if !e.is_recoverable() => return Err(e.into()),
            Err(_) => {
                let stats = backend.last_exchange();
                warn!(
                    "No telemetry for frame {} ({} polls, {} rejected)",
                    attempts, stats.polls, stats.rejected
                );
            }
        }
    }

    info!("Received {received} of {attempts} frames");
    Ok(())
}
