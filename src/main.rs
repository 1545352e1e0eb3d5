/*!
 * pathsteerd - PathSteer Edge steering daemon
 */

use std::path::PathBuf;
use std::process;

use clap::Parser;

use pathsteer::config::EngineConfig;
use pathsteer::engine::Engine;
use pathsteer::error::{EXIT_SUCCESS, SteerError};
use pathsteer::{logging, VERSION};

#[derive(Parser)]
#[command(name = "pathsteerd")]
#[command(version = VERSION)]
#[command(about = "Multi-uplink session-continuity steering engine", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH", default_value = "/etc/pathsteer/config.json")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write tracing output to a file as JSON instead of stdout
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pathsteerd: {}", e);
            process::exit(e.exit_code());
        }
    };

    if let Err(e) = logging::init(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("pathsteerd: {}", e);
        process::exit(e.exit_code());
    }

    let mut engine = match Engine::production(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "engine startup failed");
            process::exit(fatal_exit_code(&e));
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("sigterm handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        let _ = shutdown_tx.send(true);
    });

    if let Err(e) = engine.run(shutdown_rx).await {
        tracing::error!(error = %e, "engine loop failed");
        process::exit(e.exit_code());
    }

    process::exit(EXIT_SUCCESS);
}

/// Startup failures are fatal regardless of category: a daemon that
/// cannot open its event log or build its clients should not limp along.
fn fatal_exit_code(e: &SteerError) -> i32 {
    e.exit_code().max(pathsteer::error::EXIT_PARTIAL)
}
