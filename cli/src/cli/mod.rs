pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nodeping")]
#[command(author, version, about = "Keep-alive client - registers tokens and sends heartbeats through optional proxies")]
pub struct Cli {
    /// Path to config file (checked in order: local config.toml, ~/.config/nodeping/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where tokens and proxies come from (each overrides the config)
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Token file, one token per line
    #[arg(short, long)]
    pub tokens: Option<PathBuf>,

    /// Proxy file, one proxy URL per line
    #[arg(short, long)]
    pub proxies: Option<PathBuf>,

    /// Token given directly; repeatable, replaces the token file
    #[arg(long = "token", value_name = "TOKEN")]
    pub inline_tokens: Vec<String>,

    /// Ignore the proxy file and connect directly
    #[arg(long)]
    pub direct: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register every session and keep it alive until Ctrl+C
    Run {
        #[command(flatten)]
        sources: SourceArgs,

        /// Skip the risk notice
        #[arg(short, long)]
        yes: bool,
    },
    
    /// Show which sessions a run would start, without contacting the service
    Plan {
        #[command(flatten)]
        sources: SourceArgs,
    },
    
    /// Manage saved session info (file store)
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List saved sessions
    List,
    
    /// Delete all saved sessions
    Clear,
}
