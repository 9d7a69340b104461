use std::io::{self, BufRead, Write};
use std::sync::Arc;

use nodeping_core::config::Config;
use nodeping_core::heartbeat::SessionContext;
use nodeping_core::orchestrator::Orchestrator;
use nodeping_core::transport::{Endpoints, HttpTransport};
use tokio::sync::watch;

use super::{build_store, load_sources};
use crate::cli::SourceArgs;

pub async fn run(config: Config, sources: SourceArgs, yes: bool) -> anyhow::Result<()> {
    if !yes {
        let accepted = tokio::task::spawn_blocking(confirm_risk).await??;
        if !accepted {
            println!("Exiting...");
            return Ok(());
        }
    }
    
    let (tokens, proxies) = match load_sources(&config, &sources) {
        Ok(sources) => sources,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    
    let settings = config.heartbeat.settings();
    tracing::info!("Starting nodeping...");
    tracing::info!("  Ping interval: {}s", settings.ping_interval.as_secs());
    tracing::info!("  Max consecutive failures: {}", settings.max_failures);
    tracing::info!("  Request timeout: {}s", config.timeouts.request_timeout);
    match settings.reregister_delay {
        Some(delay) => tracing::info!("  Re-register after logout: {}s", delay.as_secs()),
        None => tracing::info!("  Re-register after logout: never"),
    }
    
    let ctx = SessionContext::new(
        Arc::new(HttpTransport::new(config.timeouts.request_timeout())),
        build_store(&config),
        Endpoints::default(),
        settings,
    );
    
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });
    
    tracing::info!("Press Ctrl+C to stop");
    
    let summary = Orchestrator::new(ctx).run(&tokens, &proxies, shutdown_rx).await?;
    
    if summary.shutdown > 0 {
        tracing::info!("Program terminated by user.");
    }
    if summary.logged_out == summary.sessions {
        tracing::warn!("Every session logged out. Check your tokens and proxies.");
    }
    
    Ok(())
}

/// Print the risk notice; Enter continues, anything else cancels
fn confirm_risk() -> io::Result<bool> {
    print!("By using this tool you accept the risks of automating your account. Use it at your own risk!\nPress Enter to continue or Ctrl+C to cancel... ");
    io::stdout().flush()?;
    
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().is_empty())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping all sessions");
}
