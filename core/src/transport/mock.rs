//! Scripted in-process transport for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use tokio::time::Instant;

use super::{ApiResponse, Endpoints, Transport};
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub payload: Value,
    pub proxy: Option<String>,
    pub token: String,
    pub at: Instant,
}

type Responder = dyn Fn(&RecordedCall, usize) -> Result<Value, TransportError> + Send + Sync;

/// Answers every call through a closure that sees the call and its 0-based index
/// among calls to the same URL
pub struct MockTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedCall, usize) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registration answers with `session`; pings answer with `pings[i]`,
    /// repeating the last entry once the script runs out
    pub fn scripted(session: Value, pings: Vec<Value>) -> Self {
        let endpoints = Endpoints::default();
        Self::new(move |call, index| {
            if call.url == endpoints.session {
                return Ok(session.clone());
            }
            let reply = pings
                .get(index)
                .or_else(|| pings.last())
                .cloned()
                .unwrap_or(Value::Null);
            Ok(reply)
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(
        &self,
        url: &str,
        payload: &Value,
        proxy: Option<&str>,
        token: &str,
    ) -> Result<ApiResponse, TransportError> {
        let call = RecordedCall {
            url: url.to_string(),
            payload: payload.clone(),
            proxy: proxy.map(|p| p.to_string()),
            token: token.to_string(),
            at: Instant::now(),
        };
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.iter().filter(|c| c.url == url).count();
            calls.push(call.clone());
            index
        };

        let body = (self.responder)(&call, index)?;
        ApiResponse::from_body(body).ok_or_else(|| TransportError::MissingCode(url.to_string()))
    }
}
