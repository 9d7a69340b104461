use nodeping_core::config::Config;
use nodeping_core::orchestrator::plan_sessions;

use super::load_sources;
use crate::cli::SourceArgs;

pub fn run(config: &Config, sources: &SourceArgs) -> anyhow::Result<()> {
    let (tokens, proxies) = load_sources(config, sources)?;
    let sessions = plan_sessions(&tokens, &proxies);
    
    println!("{:<5} {:<12} {:<50}", "#", "TOKEN", "PROXY");
    println!("{}", "-".repeat(68));
    
    for (idx, key) in sessions.iter().enumerate() {
        println!("{:<5} {:<12} {:<50}", idx + 1, key.masked_token(), key.proxy_label());
    }
    
    println!();
    println!(
        "{} token(s) × {} proxy(ies) = {} session(s)",
        tokens.len(),
        proxies.len().max(1),
        sessions.len()
    );
    if proxies.is_empty() {
        println!("No proxies: every session connects directly.");
    }
    
    Ok(())
}
