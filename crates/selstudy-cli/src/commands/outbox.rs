use clap::Subcommand;
use selstudy_core::{Config, DurableOutbox};

#[derive(Subcommand)]
pub enum OutboxAction {
    /// List queued calls in replay order
    List {
        /// Output as JSON (payloads decoded)
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: OutboxAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        OutboxAction::List { json } => {
            let config = Config::load_or_default();
            let outbox = DurableOutbox::new(config.outbox_path()?);
            let entries = outbox.entries().await;

            if json {
                let out: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        let payload = serde_json::from_slice::<serde_json::Value>(&e.payload)
                            .unwrap_or_else(|_| {
                                serde_json::Value::String(String::from_utf8_lossy(&e.payload).into_owned())
                            });
                        serde_json::json!({ "destinationPath": e.destination_path, "payload": payload })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            println!("{} pending ({})", entries.len(), outbox.path().display());
            for (i, entry) in entries.iter().enumerate() {
                println!("{:>3}. {} ({} bytes)", i + 1, entry.destination_path, entry.payload.len());
            }
        }
    }
    Ok(())
}
