//! Error types shared across the core

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems detected before any session starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no tokens found in {0:?}")]
    NoTokens(PathBuf),

    #[error("token list is empty")]
    EmptyTokens,

    #[error("failed to read token file {path:?}: {source}")]
    ReadTokens {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("specified config file not found: {0:?}")]
    ConfigNotFound(PathBuf),

    #[error("failed to read config {path:?}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Anything that prevents a well-formed response from reaching the caller
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid proxy {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token contains characters not allowed in a header")]
    InvalidToken,

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {0} has no integer code field")]
    MissingCode(String),
}

/// Response parsed but breaks the minimal contract
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response code {0} is negative")]
    NegativeCode(i64),

    #[error("response carries no account data")]
    MissingData,
}

/// Failure inside one registration attempt
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
