pub mod plan;
pub mod run;
pub mod sessions;

use std::sync::Arc;

use nodeping_core::config::{expand_path, Config, StoreMode};
use nodeping_core::error::ConfigError;
use nodeping_core::session::{FileSessionStore, MemorySessionStore, NoopSessionStore, SessionStore};
use nodeping_core::sources::{load_proxies, load_tokens, tokens_from_args};

use crate::cli::SourceArgs;

/// Resolve tokens and proxies from the command line, falling back to the config
pub fn load_sources(config: &Config, args: &SourceArgs) -> Result<(Vec<String>, Vec<String>), ConfigError> {
    let tokens = if args.inline_tokens.is_empty() {
        let path = args.tokens.clone().unwrap_or_else(|| config.sources.tokens.clone());
        load_tokens(&expand_path(&path))?
    } else {
        let tokens = tokens_from_args(&args.inline_tokens);
        if tokens.is_empty() {
            return Err(ConfigError::EmptyTokens);
        }
        tokens
    };
    
    let proxies = if args.direct {
        Vec::new()
    } else {
        let path = args.proxies.clone().unwrap_or_else(|| config.sources.proxies.clone());
        load_proxies(&expand_path(&path))
    };
    
    Ok((tokens, proxies))
}

pub fn build_store(config: &Config) -> Arc<dyn SessionStore> {
    match config.sessions.store {
        StoreMode::None => Arc::new(NoopSessionStore),
        StoreMode::Memory => Arc::new(MemorySessionStore::new()),
        StoreMode::File => {
            let dir = expand_path(&config.sessions.directory);
            tracing::info!("Saving session info under {:?}", dir);
            Arc::new(FileSessionStore::new(dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_inline_tokens_are_rejected() {
        let args = SourceArgs {
            inline_tokens: vec!["  ".to_string(), "# note".to_string()],
            direct: true,
            ..SourceArgs::default()
        };

        let err = load_sources(&Config::default(), &args).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyTokens));
    }

    #[test]
    fn inline_tokens_replace_the_token_file() {
        let args = SourceArgs {
            tokens: Some("/definitely/not/here.txt".into()),
            inline_tokens: vec!["T1".to_string(), "T1".to_string(), "T2".to_string()],
            direct: true,
            ..SourceArgs::default()
        };

        let (tokens, proxies) = load_sources(&Config::default(), &args).unwrap();
        assert_eq!(tokens, vec!["T1", "T2"]);
        assert!(proxies.is_empty());
    }
}
