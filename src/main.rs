//! docfold CLI entry point

use clap::Parser;
use console::style;
use docfold::cli::args::{BuildArgs, ConfigAction, ConfigArgs};
use docfold::cli::{Cli, Commands};
use docfold::config::{Config, ConfigManager};
use docfold::error::DocfoldResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DocfoldResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    let command = match cli.command {
        Some(Commands::Completions(args)) => return docfold::cli::commands::completions(args),
        other => other,
    };

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await;

    // Log format comes from config; fall back to text if it failed to load
    let json = matches!(config, Ok(ref c) if c.general.log_format == "json");
    init_logging(cli.verbose, json);
    let config = match config {
        Ok(config) => config,
        // `config init --force` must be able to replace a broken file
        Err(e) if is_config_init(&command) => {
            debug!("Ignoring unreadable config: {}", e);
            Config::default()
        }
        Err(e) => return Err(e),
    };
    debug!("Using config {}", config_manager.path().display());

    match command {
        None => docfold::cli::commands::build(BuildArgs::default(), &config).await,
        Some(Commands::Build(args)) => docfold::cli::commands::build(args, &config).await,
        Some(Commands::Status) => docfold::cli::commands::status(&config).await,
        Some(Commands::Cache(args)) => docfold::cli::commands::cache(args, &config).await,
        Some(Commands::Config(args)) => {
            docfold::cli::commands::config(args, &config_manager, &config).await
        }
        Some(Commands::Completions(_)) => Ok(()),
    }
}

fn is_config_init(command: &Option<Commands>) -> bool {
    matches!(
        command,
        Some(Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Init { .. })
        }))
    )
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` overrides
fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "docfold=warn",
        1 => "docfold=info",
        _ => "docfold=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
