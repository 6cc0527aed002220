//! Headless runner for the CellSim flock simulation.
//!
//! Usage: `cellsim-runner [config.json]`

mod frame;
mod telemetry;

use anyhow::{Context, Result};
use cellsim_core::RunnerConfig;
use cellsim_world::Simulation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => RunnerConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => RunnerConfig::default(),
    };

    info!(
        seed = config.simulation.seed,
        num_ticks = config.simulation.num_ticks,
        realtime = config.realtime,
        "Starting CellSim runner"
    );

    let mut simulation = Simulation::new(config.simulation.clone())?;
    let mut frames = if config.frame_interval > 0 {
        Some(frame::FrameWriter::open(config.frame_path.as_deref())?)
    } else {
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.store(true, Ordering::SeqCst);
        });
    }

    run_loop(&mut simulation, &config, frames.as_mut(), &shutdown).await?;

    if let Some(frames) = frames.as_mut() {
        frames.flush()?;
    }

    let report = simulation.report();
    let json = serde_json::to_string_pretty(&report)?;
    match &config.report_path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing report to {}", path))?;
            info!("Report written to {}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn run_loop(
    simulation: &mut Simulation,
    config: &RunnerConfig,
    mut frames: Option<&mut frame::FrameWriter>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut ticker = if config.realtime {
        let mut ticker = interval(simulation.clock().interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = simulation.clock().interval().as_millis() as u64, "Pacing ticks in real time");
        Some(ticker)
    } else {
        None
    };

    for i in 0..config.simulation.num_ticks {
        if shutdown.load(Ordering::SeqCst) {
            simulation.stop();
            warn!(completed = i, "Stopped before the configured tick count");
            break;
        }

        match ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => tokio::task::yield_now().await,
        }

        let Some(_summary) = simulation.step()? else {
            break;
        };

        if i % 1000 == 0 {
            info!(
                "Tick {}/{}: {} agents, {} visible",
                i,
                config.simulation.num_ticks,
                simulation.population().len(),
                simulation.population().visible_len()
            );
        }

        if let Some(frames) = frames.as_deref_mut() {
            if simulation.tick() % config.frame_interval == 0 {
                frames.write(simulation.tick(), &simulation.snapshot())?;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
