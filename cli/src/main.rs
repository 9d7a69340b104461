use clap::Parser;

mod cli;

use cli::{Cli, Commands};
use nodeping_core::config::{load_config, Config};
use nodeping_core::error::ConfigError;

fn env_filter(level: &str) -> anyhow::Result<tracing_subscriber::EnvFilter> {
    Ok(tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("nodeping={}", level).parse()?)
        .add_directive(format!("nodeping_core={}", level).parse()?))
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(env_filter(level)?).init();
    Ok(())
}

/// Read the config under a temporary info-level subscriber so lookup
/// messages and fallback errors are not lost before logging is set up
fn load_config_logged(path: Option<std::path::PathBuf>) -> anyhow::Result<Result<Config, ConfigError>> {
    let bootstrap = tracing_subscriber::fmt().with_env_filter(env_filter("info")?).finish();
    Ok(tracing::subscriber::with_default(bootstrap, || load_config(path)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    
    // Logging level comes from the config, so it has to be read first
    let config = load_config_logged(cli.config.clone())?;
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level)?;
    
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    
    match cli.command {
        Commands::Run { sources, yes } => {
            cli::commands::run::run(config, sources, yes).await?;
        }
        Commands::Plan { sources } => {
            cli::commands::plan::run(&config, &sources)?;
        }
        Commands::Sessions { command } => {
            cli::commands::sessions::run(&config, command)?;
        }
    }
    
    Ok(())
}
