use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ytail::config::resolve_config_path;

#[derive(Parser)]
#[command(name = "ytail")]
#[command(about = "Tail a log file and ship its lines to a push endpoint", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail and ship until interrupted (default)
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init {
        #[arg(long)]
        stdout: bool,
    },
    /// Load and validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ytail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Components take their logger explicitly; hand them the one just installed.
    let logger = tracing::dispatcher::get_default(|dispatch| dispatch.clone());

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run) | None => {
            ytail::cli::run::run(config_path, logger).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                ytail::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                ytail::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
