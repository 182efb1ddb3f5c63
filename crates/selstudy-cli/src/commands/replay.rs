use selstudy_core::{Config, TelemetryClient};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let client = TelemetryClient::from_config(&config)?;
    let summary = client.replay_outbox().await;
    println!(
        "attempted {}, delivered {}, remaining {}",
        summary.attempted, summary.delivered, summary.remaining
    );
    Ok(())
}
