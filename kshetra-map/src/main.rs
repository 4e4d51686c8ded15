//! Costmap node binary.

use clap::Parser;
use kshetra_map::{CostmapConfig, CostmapNode, CostmapTopics};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Configuration-space costmap builder")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(default_value = "costmap.toml")]
    config: PathBuf,
}

fn main() -> kshetra_map::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kshetra_map=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("Loading configuration from {:?}", args.config);
    let config = CostmapConfig::load(&args.config)?;

    let topics = CostmapTopics::new();
    let mut node = CostmapNode::new(&config, topics)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Release);
    })
    .expect("failed to install signal handler");

    info!("kshetra-map v{}", env!("CARGO_PKG_VERSION"));
    node.spin(&running);
    Ok(())
}
