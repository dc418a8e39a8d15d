use anyhow::{Context, Result};
use grammar_correction::{config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// `RUST_LOG` takes precedence over `server.logs.level`.
fn init_tracing(configured_level: &str) -> Result<String> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| configured_level.to_string());
    level.parse::<LevelFilter>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&level))
        .json()
        .init();
    Ok(level)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()
        .await
        .context("Failed to load configuration")?;
    let level = init_tracing(&config.server.logs.level)?;

    info!("Starting Grammar Correction API (log level {})", level);
    server::run(config).await?;
    Ok(())
}
