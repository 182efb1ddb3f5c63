//! Study session commands for CLI.

use clap::Subcommand;
use selstudy_core::StudySession;

use super::connected_client;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Register a session with the collector (offline id if unreachable)
    Start {
        /// Participant identifier (defaults to study.participant_id)
        #[arg(long)]
        participant: Option<String>,
        /// Counterbalance arm, 0 or 1 (random when omitted)
        #[arg(long)]
        arm: Option<u8>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Start {
            participant,
            arm,
            json,
        } => {
            let (config, client) = connected_client().await?;
            let participant = participant
                .or_else(|| config.study.participant_id.clone())
                .ok_or("no participant id: pass --participant or set study.participant_id")?;

            let session = StudySession::start(client, &participant, arm).await?;
            let tasks = session.ordered_tasks(config.tasks()?);

            if json {
                let out = serde_json::json!({
                    "sessionId": session.session_id(),
                    "participantId": session.participant_id(),
                    "counterbalanceArm": session.counterbalance_arm(),
                    "offline": session.is_offline(),
                    "tasks": tasks,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }

            let mode = if session.is_offline() { " (offline)" } else { "" };
            println!("Session: {}{mode}", session.session_id());
            println!("Arm: {}", session.counterbalance_arm());
            for (i, task) in tasks.iter().enumerate() {
                println!("{:>2}. [{}] {}", i + 1, task.method, task.title);
            }
        }
    }
    Ok(())
}
