//! Transport - authenticated JSON POSTs to the remote service

pub mod client;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{TransportError, ValidationError};

pub use client::HttpTransport;

const SESSION_URL: &str = "https://api.nodepay.org/api/auth/session";
const PING_URL: &str = "https://nw.nodepay.org/api/network/ping";

/// Remote endpoints. Fixed in production; tests point them at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub session: String,
    pub ping: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            session: SESSION_URL.to_string(),
            ping: PING_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Same paths as production, served from `base`
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            session: format!("{}/api/auth/session", base),
            ping: format!("{}/api/network/ping", base),
        }
    }
}

/// Decoded response body. `code` is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub code: i64,
    pub msg: Option<String>,
    pub data: Value,
}

impl ApiResponse {
    /// Returns None when the body has no integer `code`
    pub fn from_body(body: Value) -> Option<Self> {
        let code = body.get("code")?.as_i64()?;
        let msg = body.get("msg").and_then(|v| v.as_str()).map(|s| s.to_string());
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        Some(Self { code, msg, data })
    }

    pub fn validate(&self) -> Result<&Self, ValidationError> {
        if self.code < 0 {
            return Err(ValidationError::NegativeCode(self.code));
        }
        Ok(self)
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` to `url` as `token`, through `proxy` when given
    async fn call(
        &self,
        url: &str,
        payload: &Value,
        proxy: Option<&str>,
        token: &str,
    ) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_without_integer_code_is_rejected() {
        assert!(ApiResponse::from_body(json!({"data": {}})).is_none());
        assert!(ApiResponse::from_body(json!({"code": "0"})).is_none());
        assert!(ApiResponse::from_body(json!([1, 2])).is_none());
    }

    #[test]
    fn negative_code_fails_validation() {
        let resp = ApiResponse::from_body(json!({"code": -1, "msg": "expired"})).unwrap();

        assert_eq!(resp.msg.as_deref(), Some("expired"));
        assert_eq!(resp.validate().unwrap_err(), ValidationError::NegativeCode(-1));
        assert!(!resp.is_success());
    }

    #[test]
    fn positive_code_is_valid_but_not_success() {
        let resp = ApiResponse::from_body(json!({"code": 1, "data": {"x": 1}})).unwrap();

        assert!(resp.validate().is_ok());
        assert!(!resp.is_success());
        assert_eq!(resp.data, json!({"x": 1}));
    }

    #[test]
    fn endpoints_share_production_paths() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9000/");

        assert_eq!(endpoints.session, "http://127.0.0.1:9000/api/auth/session");
        assert_eq!(endpoints.ping, "http://127.0.0.1:9000/api/network/ping");
        assert!(Endpoints::default().ping.starts_with("https://"));
    }
}
