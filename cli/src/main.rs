//! WVMC CLI server
//!
//! Headless control plane for Hyper-V virtual machines, suitable for a
//! Windows service, a container or a standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/wvmc/config.toml)
//! wvmc
//!
//! # Custom config path
//! wvmc --config C:\wvmc\config.toml
//!
//! # Override the listen port
//! wvmc --port 9090
//!
//! # Validate config without starting
//! wvmc --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use wvmc::config::AppConfig;
use wvmc::server::{init_tracing, ServerHandle, ServerOptions};

/// WVMC: sign-in, access control and power/network commands for Hyper-V machines.
#[derive(Parser, Debug)]
#[command(
    name = "wvmc",
    version,
    about = "Control plane for Hyper-V virtual machines",
    long_about = "WVMC: REST API for listing, starting, stopping and \
                  disconnecting Hyper-V virtual machines with per-user access control.\n\n\
                  Default config: ~/.config/wvmc/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "WVMC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(wvmc::default_config_path);

    let loaded = AppConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Hosts       : {}", config.hypervisor.hosts.join(", "));
        println!("   Refresh     : every {}s", config.scheduler.refresh_interval_secs);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;

    Ok(())
}
