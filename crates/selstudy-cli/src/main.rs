use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "selstudy", version, about = "Selection study CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Study task catalogue
    Tasks {
        #[command(subcommand)]
        action: commands::tasks::TasksAction,
    },
    /// Study sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Retry every undelivered telemetry call once
    Replay,
    /// Inspect the undelivered telemetry queue
    Outbox {
        #[command(subcommand)]
        action: commands::outbox::OutboxAction,
    },
    /// Feed a scripted event log through one task attempt
    Run(commands::run::RunArgs),
    /// System Usability Scale questionnaire
    Sus {
        #[command(subcommand)]
        action: commands::sus::SusAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SELSTUDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("selstudy=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Tasks { action } => commands::tasks::run(action),
        Commands::Session { action } => commands::session::run(action).await,
        Commands::Replay => commands::replay::run().await,
        Commands::Outbox { action } => commands::outbox::run(action).await,
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Sus { action } => commands::sus::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
