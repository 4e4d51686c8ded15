//! Tracker node binary.

use clap::Parser;
use marga_tracker::{TrackerConfig, TrackerNode, TrackerTopics};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Trajectory tracker for a differential-drive robot")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(default_value = "tracker.toml")]
    config: PathBuf,
}

fn main() -> marga_tracker::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marga_tracker=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("Loading configuration from {:?}", args.config);
    let config = TrackerConfig::load(&args.config)?;

    let topics = TrackerTopics::new();
    let mut node = TrackerNode::new(config, topics)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Release);
    })
    .expect("failed to install signal handler");

    info!("marga-tracker v{}", env!("CARGO_PKG_VERSION"));
    node.spin(&running);
    Ok(())
}
