pub mod config;
pub mod outbox;
pub mod replay;
pub mod run;
pub mod session;
pub mod sus;
pub mod tasks;

use selstudy_core::{Config, TelemetryClient};

/// Client built from the saved config, with the outbox replayed once.
///
/// Every command that talks to the collector starts here.
pub(crate) async fn connected_client() -> Result<(Config, TelemetryClient), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let client = TelemetryClient::from_config(&config)?;
    tracing::debug!("collector at {}", config.collector.base_url);
    let summary = client.replay_outbox().await;
    if summary.attempted > 0 {
        eprintln!(
            "outbox: {} of {} queued call(s) delivered",
            summary.delivered, summary.attempted
        );
    }
    Ok((config, client))
}
