//! Built-in physics peer speaking the JSON simulator protocol.
//!
//! Listens for 40-byte control frames and answers each one with telemetry
//! from a vertical point-mass model. Stops on Ctrl-C.
//!
//! Usage:
//!   cargo run -p simlink_sitl --bin mock_physics -- [OPTIONS]

use std::io::Write;
use std::net::SocketAddr;
use std::process;

use clap::Parser;
use log::{error, info};
use simlink_sitl::physics::{PhysicsServer, PointMassConfig, PointMassModel, ServerOptions};

#[derive(Parser)]
#[command(name = "mock_physics")]
#[command(about = "Point-mass physics peer for the JSON simulator protocol")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:9002")]
    bind: SocketAddr,

    /// RNG seed for reproducible sensor noise
    #[arg(long)]
    seed: Option<u64>,

    /// Send a malformed datagram before every N-th reply
    #[arg(long, value_name = "N")]
    garbage_every: Option<u32>,

    /// Add accelerometer and gyroscope noise
    #[arg(long)]
    noise: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
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

    let base = if args.noise {
        PointMassConfig::noisy()
    } else {
        PointMassConfig::default()
    };
    let config = PointMassConfig {
        seed: args.seed,
        ..base
    };
    let model = PointMassModel::new(config);
    let config = model.config();
    info!(
        "Point mass {:.2} kg, max thrust {:.1} N, hover throttle {:.3}",
        config.mass_kg,
        config.max_thrust_n,
        config.hover_throttle()
    );

    let options = ServerOptions {
        garbage_every: args.garbage_every,
    };
    let server = match PhysicsServer::bind(args.bind, model, options).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start physics server on {}: {e}", args.bind);
            process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
    };

    match server.run_until(shutdown).await {
        Ok(stats) => info!(
            "Served {} frames ({} invalid, {} malformed replies injected)",
            stats.frames, stats.invalid, stats.garbage_sent
        ),
        Err(e) => {
            error!("Physics server failed: {e}");
            process::exit(1);
        }
    }
}
