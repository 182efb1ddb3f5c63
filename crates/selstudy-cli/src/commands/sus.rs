use clap::Subcommand;
use selstudy_core::{sus_score, StudySession};

use super::connected_client;

#[derive(Subcommand)]
pub enum SusAction {
    /// Submit ten SUS answers for a session
    Submit {
        /// Session the questionnaire belongs to
        #[arg(long)]
        session_id: String,
        /// Comma-separated answers, each 1..=5 (e.g. 4,2,5,1,4,2,4,1,5,2)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        responses: Vec<u8>,
    },
    /// Compute the SUS score without submitting
    Score {
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        responses: Vec<u8>,
    },
}

pub async fn run(action: SusAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SusAction::Submit {
            session_id,
            responses,
        } => {
            let (config, client) = connected_client().await?;
            let session =
                StudySession::resume(client, session_id, config.study.participant_id.clone(), 0);
            let status = session.submit_sus(&responses).await?;
            println!("{status} (score {:.1})", sus_score(&responses));
        }
        SusAction::Score { responses } => {
            selstudy_core::session::validate_sus_responses(&responses)?;
            println!("{:.1}", sus_score(&responses));
        }
    }
    Ok(())
}
