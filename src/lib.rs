use anyhow::{Context, Result};
use colored::Colorize;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod logger;
pub mod relay;

/// Run the relay: load `.env`, load config, serve until ctrl-c, then print
/// the session statistics.
pub async fn run() -> Result<()> {
    // Load environment variables from .env (RELAY_PORT, RELAY_MAX_HISTORY)
    dotenv().ok();

    let config = config::AppConfig::load();
    let addr = format!("127.0.0.1:{}", config.port);

    let state = Arc::new(relay::RelayState::new(config));
    let handle = relay::start(state.clone(), &addr).await?;

    print_banner(&handle.ws_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    println!("\n{}", "Shutting down...".yellow());
    state.metrics.read().await.display();

    // Connections that never close would hold the drain open forever, so
    // cap the wait: ctrl-c always exits.
    if let Ok(result) = tokio::time::timeout(Duration::from_secs(2), handle.stop()).await {
        result?;
    }

    Ok(())
}

fn print_banner(url: &str) {
    println!("{}", "====================================".bright_cyan());
    println!("{}", "          CHAT RELAY v0.1           ".bright_cyan().bold());
    println!("{}", "====================================".bright_cyan());
    println!(" Relay listening on {}", url.bright_green());
    println!("{}\n", " Press Ctrl-C to stop".dimmed());
}

// Re-exports for library consumers: common useful types
pub use config::AppConfig;
pub use relay::{RelayHandle, RelayState};
