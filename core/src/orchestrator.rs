//! Orchestrator - fans tokens × proxies out into independent heartbeat loops

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::ConfigError;
use crate::heartbeat::{Session, SessionContext, SessionExit};
use crate::session::SessionKey;

/// How a run ended, per session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: usize,
    pub logged_out: usize,
    pub shutdown: usize,
    pub crashed: usize,
}

/// Every (token, proxy) pair to run, token-major. No proxies means one
/// direct session per token.
pub fn plan_sessions(tokens: &[String], proxies: &[String]) -> Vec<SessionKey> {
    if proxies.is_empty() {
        return tokens
            .iter()
            .map(|token| SessionKey::new(token.clone(), None))
            .collect();
    }

    tokens
        .iter()
        .flat_map(|token| {
            proxies
                .iter()
                .map(move |proxy| SessionKey::new(token.clone(), Some(proxy.clone())))
        })
        .collect()
}

pub struct Orchestrator {
    ctx: SessionContext,
}

impl Orchestrator {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Start one loop per planned session. Fails without starting anything
    /// when there are no tokens.
    pub fn spawn(
        &self,
        tokens: &[String],
        proxies: &[String],
        shutdown: &watch::Receiver<bool>,
    ) -> Result<JoinSet<SessionExit>, ConfigError> {
        if tokens.is_empty() {
            return Err(ConfigError::EmptyTokens);
        }

        let keys = plan_sessions(tokens, proxies);
        if proxies.is_empty() {
            tracing::warn!("No proxies configured. Running {} session(s) without proxy.", keys.len());
        } else {
            tracing::info!(
                "Starting {} session(s): {} token(s) × {} proxy(ies)",
                keys.len(),
                tokens.len(),
                proxies.len()
            );
        }

        let mut join_set = JoinSet::new();
        for key in keys {
            tracing::debug!("Spawning heartbeat loop for {}", key);
            let session = Session::new(key, self.ctx.clone());
            join_set.spawn(session.run(shutdown.clone()));
        }

        Ok(join_set)
    }

    /// Run every session to completion: logout on its own, or shutdown
    pub async fn run(
        &self,
        tokens: &[String],
        proxies: &[String],
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, ConfigError> {
        let mut join_set = self.spawn(tokens, proxies, &shutdown)?;
        let mut summary = RunSummary {
            sessions: join_set.len(),
            ..RunSummary::default()
        };

        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(SessionExit::LoggedOut) => summary.logged_out += 1,
                Ok(SessionExit::Shutdown) => summary.shutdown += 1,
                Err(e) => {
                    tracing::error!("Session task panicked: {}", e);
                    summary.crashed += 1;
                }
            }
        }

        tracing::info!(
            "All sessions finished: {} logged out, {} stopped by shutdown, {} crashed",
            summary.logged_out,
            summary.shutdown,
            summary.crashed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeartbeatSettings;
    use crate::session::NoopSessionStore;
    use crate::transport::mock::MockTransport;
    use crate::transport::Endpoints;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn orchestrator(transport: Arc<MockTransport>) -> Orchestrator {
        Orchestrator::new(SessionContext::new(
            transport,
            Arc::new(NoopSessionStore),
            Endpoints::default(),
            HeartbeatSettings::default(),
        ))
    }

    #[test]
    fn plan_is_cross_product() {
        let keys = plan_sessions(&strings(&["T1", "T2"]), &strings(&["p1", "p2", "p3"]));

        assert_eq!(keys.len(), 6);
        assert_eq!(keys[0], SessionKey::new("T1", Some("p1".into())));
        assert_eq!(keys[3], SessionKey::new("T2", Some("p1".into())));
        assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 6);
    }

    #[test]
    fn plan_without_proxies_is_direct() {
        let keys = plan_sessions(&strings(&["T1", "T2", "T3"]), &[]);

        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k.proxy.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_tokens_start_nothing() {
        let transport = Arc::new(MockTransport::scripted(json!({"code": 0}), vec![]));
        let (_tx, rx) = watch::channel(false);

        let err = orchestrator(transport.clone()).run(&[], &strings(&["p1"]), rx).await;

        assert!(matches!(err, Err(ConfigError::EmptyTokens)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_pair_gets_its_own_loop() {
        // no uid: every loop registers once and logs out
        let transport = Arc::new(MockTransport::scripted(json!({"code": 0, "data": {}}), vec![]));
        let (_tx, rx) = watch::channel(false);

        let summary = orchestrator(transport.clone())
            .run(&strings(&["T1", "T2"]), &strings(&["p1", "p2"]), rx)
            .await
            .unwrap();

        assert_eq!(summary.sessions, 4);
        assert_eq!(summary.logged_out, 4);

        let pairs: HashSet<(String, Option<String>)> = transport
            .calls()
            .into_iter()
            .map(|c| (c.token, c.proxy))
            .collect();
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&("T2".to_string(), Some("p1".to_string()))));
    }

    #[tokio::test(start_paused = true)]
    async fn one_logout_does_not_stop_siblings() {
        let transport = Arc::new(MockTransport::new(|call, _| {
            if call.url == Endpoints::default().session {
                if call.token == "bad" {
                    return Ok(json!({"code": 0, "data": {}}));
                }
                return Ok(json!({"code": 0, "data": {"uid": call.token.clone()}}));
            }
            Ok(json!({"code": 0}))
        }));
        let (tx, rx) = watch::channel(false);
        let orchestrator = orchestrator(transport.clone());

        let run = tokio::spawn(async move {
            orchestrator
                .run(&strings(&["bad", "good"]), &[], rx)
                .await
        });

        tokio::time::sleep(Duration::from_secs(130)).await;
        tx.send(true).unwrap();
        let summary = run.await.unwrap().unwrap();

        assert_eq!(
            summary,
            RunSummary { sessions: 2, logged_out: 1, shutdown: 1, crashed: 0 }
        );
        let good_pings = transport
            .calls_to(&Endpoints::default().ping)
            .into_iter()
            .filter(|c| c.token == "good")
            .count();
        assert_eq!(good_pings, 3);
    }
}
