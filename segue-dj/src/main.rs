//! Segue DJ daemon - main entry point
//!
//! Wires the services together: remote player client, AI-backed analyzer
//! and planner, bridge generator, queue, transition engine, the 1 Hz
//! playback monitor, and the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use segue_dj::ai::llm::LlmClient;
use segue_dj::analysis::TrackAnalyzer;
use segue_dj::api::{self, AppContext};
use segue_dj::bridge::BridgeGenerator;
use segue_dj::engine::TransitionEngine;
use segue_dj::monitor::PlaybackMonitor;
use segue_dj::planner::TransitionPlanner;
use segue_dj::player::connect::ConnectPlayer;
use segue_dj::queue::QueueManager;
use segue_dj::state::SharedState;

/// Command-line arguments for segue-dj
#[derive(Parser, Debug)]
#[command(name = "segue-dj")]
#[command(about = "AI DJ auto-transition daemon")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SEGUE_PORT")]
    port: Option<u16>,

    /// Path to config file
    #[arg(short, long, env = "SEGUE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = segue_common::config::Config::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let port = args.port.unwrap_or(config.port);

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("segue_dj={},tower_http=debug", config.logging.level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Segue DJ daemon on port {}", port);

    let state = Arc::new(SharedState::new());
    let queue = Arc::new(QueueManager::new());

    let ai = Arc::new(LlmClient::new(&config.ai));
    let analyzer = Arc::new(TrackAnalyzer::new(ai.clone()));
    let planner = TransitionPlanner::new(ai);

    let player = Arc::new(ConnectPlayer::new(&config.player));
    let bridge = Arc::new(if config.bridge.enabled {
        BridgeGenerator::new(&config.bridge)
    } else {
        BridgeGenerator::silent()
    });

    let engine = TransitionEngine::new(
        player.clone(),
        analyzer.clone(),
        planner,
        bridge,
        queue.clone(),
        state.clone(),
    );
    info!("Transition engine initialized");

    let monitor = PlaybackMonitor::new(
        player.clone(),
        analyzer.clone(),
        engine.clone(),
        queue.clone(),
        state.clone(),
    );
    tokio::spawn(monitor.run());

    let ctx = AppContext {
        state,
        engine,
        queue,
        analyzer,
        player,
    };
    api::run(port, ctx).await.context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
