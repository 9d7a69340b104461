//! reqwest-backed transport

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;

use super::{ApiResponse, Transport};
use crate::error::TransportError;
use crate::session::redact_proxy;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
const REFERER: &str = "https://app.nodepay.ai";
const DIRECT: &str = "";

/// Builds one client per proxy on first use and reuses it afterwards
pub struct HttpTransport {
    clients: DashMap<String, Client>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            timeout,
        }
    }

    fn build_client(&self, proxy: Option<&str>) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(self.timeout.min(Duration::from_secs(20)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match proxy {
            Some(proxy) => {
                let p = reqwest::Proxy::all(proxy).map_err(|source| TransportError::InvalidProxy {
                    proxy: redact_proxy(proxy),
                    source,
                })?;
                builder = builder.proxy(p);
                tracing::debug!("Built client for proxy {}", redact_proxy(proxy));
            }
            None => {
                builder = builder.no_proxy();
            }
        }

        builder.build().map_err(TransportError::Client)
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, TransportError> {
        let cache_key = proxy.unwrap_or(DIRECT);
        if let Some(client) = self.clients.get(cache_key) {
            return Ok(client.clone());
        }

        let client = self.build_client(proxy)?;
        self.clients.insert(cache_key.to_string(), client.clone());
        Ok(client)
    }

    fn headers(token: &str) -> Result<header::HeaderMap, TransportError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| TransportError::InvalidToken)?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));
        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        url: &str,
        payload: &Value,
        proxy: Option<&str>,
        token: &str,
    ) -> Result<ApiResponse, TransportError> {
        let client = self.client_for(proxy)?;
        let headers = Self::headers(token)?;

        let response = client
            .post(url)
            .headers(headers)
            .json(payload)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;
        let body: Value = serde_json::from_slice(&bytes).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })?;

        ApiResponse::from_body(body).ok_or_else(|| TransportError::MissingCode(url.to_string()))
    }
}
