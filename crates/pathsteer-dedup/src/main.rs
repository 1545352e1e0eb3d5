//! pathsteer-dedupd - Controller-side dedup daemon
//!
//! Binds one UDP socket per tunnel input; decapsulated packets from every
//! input funnel through the first-arrival gate, and survivors are
//! re-emitted unchanged toward the egress address. A background cadence
//! sweeps expired flows each second and logs the stats line every 10 s.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{info, warn};

use pathsteer_dedup::{DedupEngine, FlowTable, Verdict};

/// Sweep cadence (expired-flow expiry)
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Stats line cadence
const STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Largest decapsulated packet we expect from a tunnel
const MAX_PACKET: usize = 9_216;

#[derive(Parser)]
#[command(name = "pathsteer-dedupd")]
#[command(version, about = "First-arrival packet deduplicator", long_about = None)]
struct Cli {
    /// Tunnel input sockets (repeat per tunnel)
    #[arg(short, long = "listen", value_name = "ADDR:PORT", required = true)]
    listen: Vec<SocketAddr>,

    /// Egress address for forwarded packets
    #[arg(short, long, value_name = "ADDR:PORT")]
    forward: SocketAddr,

    /// Flow entry TTL in milliseconds
    #[arg(long, default_value_t = pathsteer_dedup::table::DEFAULT_TTL_MS)]
    ttl_ms: i64,

    /// Flow table capacity (rounded up to a power of two)
    #[arg(long, default_value_t = pathsteer_dedup::table::DEFAULT_CAPACITY)]
    capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pathsteer_dedup=info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let egress = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("bind egress socket")?;
    egress
        .connect(cli.forward)
        .await
        .with_context(|| format!("connect egress to {}", cli.forward))?;

    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(4_096);
    for addr in &cli.listen {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("bind tunnel input {}", addr))?;
        info!(%addr, "tunnel input up");
        let tx = tx.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_PACKET];
            loop {
                match socket.recv(&mut buf).await {
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "tunnel input recv failed");
                    }
                }
            }
        });
    }
    drop(tx);

    let mut engine = DedupEngine::new(FlowTable::new(cli.capacity, cli.ttl_ms));
    info!(
        inputs = cli.listen.len(),
        forward = %cli.forward,
        ttl_ms = cli.ttl_ms,
        "dedup engine up"
    );

    let started = Instant::now();
    let mut sweep_tick = tokio::time::interval(SWEEP_INTERVAL);
    let mut stats_tick = tokio::time::interval(STATS_INTERVAL);

    loop {
        tokio::select! {
            packet = rx.recv() => {
                let Some(packet) = packet else { break };
                let now_ms = started.elapsed().as_millis() as i64;
                if engine.ingest(&packet, now_ms) == Verdict::Forward {
                    if let Err(e) = egress.send(&packet).await {
                        warn!(error = %e, "egress send failed");
                    }
                }
            }
            _ = sweep_tick.tick() => {
                let now_ms = started.elapsed().as_millis() as i64;
                engine.sweep(now_ms);
            }
            _ = stats_tick.tick() => {
                info!("{}", engine.stats().summary());
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    info!("{}", engine.stats().summary());
    Ok(())
}
