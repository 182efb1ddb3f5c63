//! Task catalogue commands for CLI.

use clap::Subcommand;
use selstudy_core::task::ordered_for_arm;
use selstudy_core::Config;

#[derive(Subcommand)]
pub enum TasksAction {
    /// List tasks in presentation order
    List {
        /// Counterbalance arm (0 or 1)
        #[arg(long, default_value_t = 0)]
        arm: u8,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: TasksAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TasksAction::List { arm, json } => {
            if arm > 1 {
                return Err(format!("arm must be 0 or 1, got {arm}").into());
            }
            let config = Config::load_or_default();
            let tasks = ordered_for_arm(config.tasks()?, arm);

            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
                return Ok(());
            }
            for (i, task) in tasks.iter().enumerate() {
                let training = if task.training { " (training)" } else { "" };
                println!(
                    "{:>2}. [{}] {}{training}: select \"{}\"",
                    i + 1,
                    task.method,
                    task.title,
                    task.target
                );
            }
        }
    }
    Ok(())
}
