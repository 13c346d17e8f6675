use clap::Parser;
use pkg_constants::paths;
use pkg_controllers::grant::GrantController;
use pkg_state::client::StateStore;
use pkg_types::config::{AgentConfigFile, load_config_file};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "authsync-agent", about = "authsync spoke agent")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = paths::DEFAULT_AGENT_CONFIG)]
    config: String,

    /// Directory for the hub state store
    #[arg(long)]
    hub_data_dir: Option<String>,

    /// Directory for the spoke state store
    #[arg(long)]
    spoke_data_dir: Option<String>,

    /// Seconds between full resyncs of all grants
    #[arg(long)]
    resync_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: AgentConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let hub_data_dir = cli
        .hub_data_dir
        .or(file_cfg.hub_data_dir)
        .unwrap_or_else(|| paths::DEFAULT_HUB_DATA_DIR.to_string());
    let spoke_data_dir = cli
        .spoke_data_dir
        .or(file_cfg.spoke_data_dir)
        .unwrap_or_else(|| paths::DEFAULT_SPOKE_DATA_DIR.to_string());
    let resync_secs = cli
        .resync_interval
        .or(file_cfg.resync_interval_secs)
        .unwrap_or(30);

    info!("Starting authsync-agent");
    info!("  Hub data dir:   {}", hub_data_dir);
    info!("  Spoke data dir: {}", spoke_data_dir);
    info!("  Resync:         {}s", resync_secs);

    let hub = StateStore::new(&hub_data_dir).await?;
    let spoke = StateStore::new(&spoke_data_dir).await?;

    let controller = GrantController::new(hub.clone(), spoke.clone())
        .with_resync_interval(Duration::from_secs(resync_secs));
    let handle = controller.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down authsync-agent");
    handle.abort();
    hub.close().await?;
    spoke.close().await?;

    Ok(())
}
