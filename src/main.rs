use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::time::Duration;

use telnet_console_client::{config, protocol, ui};

/// Telnet Console - Minecraft server telnet administration client
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the configuration file
    #[clap(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server address to connect to (host or host:port)
    #[clap(short, long)]
    server: Option<String>,

    /// Verbose mode (repeat for more verbosity)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Configure logging based on verbosity level
    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    info!("Starting telnet console v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = args.config.unwrap_or_else(|| {
        dirs::config_dir()
            .expect("Could not find config directory")
            .join("telnet_console")
            .join("config.toml")
    });

    let mut config = config::load_config(&config_path).await?;
    info!("Configuration loaded from {:?}", config_path);

    // Pick the server to dial
    let entry = match ui::select_server(&config, args.server.as_deref()) {
        Some(entry) => entry,
        None => {
            anyhow::bail!(
                "No server configured; pass --server or add one to {:?}",
                config_path
            );
        }
    };

    // Wire the session core to its single event consumer
    let (events, events_rx) = protocol::session_channel(config.connection.event_buffer);
    let manager = protocol::ConnectionManager::new(
        Duration::from_secs(config.connection.connect_timeout_secs),
        events,
    );

    // Connect to the server
    info!("Connecting to {} ({})", entry.name, entry.address);
    if let Err(e) = manager.connect(&entry.address).await {
        log::error!("Failed to connect to server: {}", e);
        return Err(e.into());
    }

    // Remember the successful connection
    ui::record_connection(&mut config.servers, &entry.name, &entry.address);
    if let Err(e) = config::save_config(&config_path, &config).await {
        log::warn!("Failed to save server list: {}", e);
    }

    // Run the application
    let app = ui::ConsoleApp::new(manager, events_rx, config);
    app.run().await?;

    Ok(())
}
