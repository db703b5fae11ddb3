#![cfg(not(tarpaulin_include))]

use composer::app;
use composer::config::ComposerConfig;

/// Main entry point for the composer server
///
/// Loads `composer.toml` (or the file named by the first argument), applies
/// environment overrides and serves the composer API.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "composer.toml".to_string());
    let config = ComposerConfig::load(&path)?;

    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .init();

    app::run(config).await
}
