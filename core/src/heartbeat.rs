//! Heartbeat - registration and the per-session ping loop
//!
//! Each [`Session`] is owned by exactly one task. Nothing in here is shared
//! between sessions except the transport and the store, both of which are
//! safe to call concurrently.

use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::HeartbeatSettings;
use crate::error::{SessionError, ValidationError};
use crate::session::{AccountInfo, ConnectionStatus, SessionInfo, SessionKey, SessionStore};
use crate::transport::{Endpoints, Transport};

/// Collaborators every session needs; cloned into each one
#[derive(Clone)]
pub struct SessionContext {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn SessionStore>,
    pub endpoints: Endpoints,
    pub settings: HeartbeatSettings,
}

impl SessionContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        endpoints: Endpoints,
        settings: HeartbeatSettings,
    ) -> Self {
        Self {
            transport,
            store,
            endpoints,
            settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Ready,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// Throttled, no request sent
    Skipped,
    Connected,
    Failed { failures: u32 },
    LoggedOut,
}

/// Why a session loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    LoggedOut,
    Shutdown,
}

pub struct Session {
    key: SessionKey,
    ctx: SessionContext,
    browser_id: Option<String>,
    account: Option<AccountInfo>,
    status: ConnectionStatus,
    last_ping: Option<Instant>,
    consecutive_failures: u32,
}

impl Session {
    pub fn new(key: SessionKey, ctx: SessionContext) -> Self {
        Self {
            key,
            ctx,
            browser_id: None,
            account: None,
            status: ConnectionStatus::NoConnection,
            last_ping: None,
            consecutive_failures: 0,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn browser_id(&self) -> Option<&str> {
        self.browser_id.as_deref()
    }

    pub fn account(&self) -> Option<&AccountInfo> {
        self.account.as_ref()
    }

    /// True between a successful registration and the next logout
    pub fn is_registered(&self) -> bool {
        self.account.is_some()
    }

    /// Establish the account identity. Never fails outward: every problem
    /// ends in a logout.
    pub async fn register(&mut self) -> Registration {
        match self.try_register().await {
            Ok(Registration::Ready) => Registration::Ready,
            Ok(Registration::LoggedOut) => {
                tracing::warn!("No account uid for {}", self.key);
                self.logout();
                Registration::LoggedOut
            }
            Err(e) => {
                tracing::error!("Registration failed for {}: {}", self.key, e);
                self.logout();
                Registration::LoggedOut
            }
        }
    }

    async fn try_register(&mut self) -> Result<Registration, SessionError> {
        // last_ping survives re-registration: the throttle is per session, not per identity
        self.status = ConnectionStatus::NoConnection;
        self.consecutive_failures = 0;

        if let Some(info) = self.ctx.store.load(&self.key) {
            if info.account.uid().is_some() {
                tracing::info!("Reusing saved registration for {}", self.key);
                self.browser_id = Some(info.browser_id);
                self.account = Some(info.account);
                return Ok(Registration::Ready);
            }
            tracing::debug!("Saved registration for {} has no uid, discarding", self.key);
            self.ctx.store.clear(&self.key);
        }

        let browser_id = uuid::Uuid::new_v4().to_string();
        self.browser_id = Some(browser_id.clone());

        let response = self
            .ctx
            .transport
            .call(
                &self.ctx.endpoints.session,
                &json!({}),
                self.key.proxy.as_deref(),
                &self.key.token,
            )
            .await?;
        response.validate()?;

        let account = AccountInfo::from_data(&response.data).ok_or(ValidationError::MissingData)?;
        if account.uid().is_none() {
            return Ok(Registration::LoggedOut);
        }

        self.ctx
            .store
            .save(&self.key, &SessionInfo::new(browser_id, account.clone()));
        self.account = Some(account);
        Ok(Registration::Ready)
    }

    /// Send one heartbeat, unless the last one was under a ping interval ago
    pub async fn ping(&mut self) -> PingOutcome {
        let uid = match self.account.as_ref().and_then(|a| a.uid()) {
            Some(uid) => uid,
            None => return PingOutcome::LoggedOut,
        };

        let now = Instant::now();
        if let Some(last) = self.last_ping {
            if now.duration_since(last) < self.ctx.settings.ping_interval {
                tracing::debug!("Skipping ping for {}, not enough time elapsed", self.key);
                return PingOutcome::Skipped;
            }
        }
        // Stamp before sending so a slow request can't trigger a second one
        self.last_ping = Some(now);

        let payload = json!({
            "id": uid,
            "browser_id": self.browser_id,
            "timestamp": chrono::Utc::now().timestamp(),
        });

        let result = self
            .ctx
            .transport
            .call(
                &self.ctx.endpoints.ping,
                &payload,
                self.key.proxy.as_deref(),
                &self.key.token,
            )
            .await;

        match result {
            Ok(response) if response.is_success() => {
                self.consecutive_failures = 0;
                self.status = ConnectionStatus::Connected;
                tracing::info!("Ping successful for {}", self.key);
                PingOutcome::Connected
            }
            Ok(response) => {
                tracing::warn!(
                    "Ping for {} returned code {} ({})",
                    self.key,
                    response.code,
                    response.msg.as_deref().unwrap_or("-")
                );
                self.handle_failure()
            }
            Err(e) => {
                tracing::warn!("Ping failed for {}: {}", self.key, e);
                self.handle_failure()
            }
        }
    }

    fn handle_failure(&mut self) -> PingOutcome {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.ctx.settings.max_failures {
            tracing::error!(
                "{} consecutive ping failures for {}. Logging out.",
                self.consecutive_failures,
                self.key
            );
            self.logout();
            return PingOutcome::LoggedOut;
        }

        if self.status == ConnectionStatus::Connected {
            self.status = ConnectionStatus::Disconnected;
        }
        PingOutcome::Failed {
            failures: self.consecutive_failures,
        }
    }

    /// Forget the identity and stop pinging. Local to this session only.
    pub fn logout(&mut self) {
        self.ctx.store.clear(&self.key);
        self.account = None;
        self.browser_id = None;
        self.status = ConnectionStatus::NoConnection;
        tracing::info!("Logged out and cleared session info for {}", self.key);
    }

    /// Register, then ping every interval until logged out or shut down
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SessionExit {
        let interval = self.ctx.settings.ping_interval;

        loop {
            let registration = match until_shutdown(&mut shutdown, self.register()).await {
                Some(registration) => registration,
                None => return SessionExit::Shutdown,
            };

            if registration == Registration::Ready {
                tracing::info!("Session {} registered, starting heartbeat", self.key);
                loop {
                    let outcome = match until_shutdown(&mut shutdown, self.ping()).await {
                        Some(outcome) => outcome,
                        None => return SessionExit::Shutdown,
                    };
                    if outcome == PingOutcome::LoggedOut {
                        break;
                    }
                    if until_shutdown(&mut shutdown, tokio::time::sleep(interval))
                        .await
                        .is_none()
                    {
                        return SessionExit::Shutdown;
                    }
                }
            }

            match self.ctx.settings.reregister_delay {
                None => return SessionExit::LoggedOut,
                Some(delay) => {
                    tracing::info!("Registering {} again in {}s", self.key, delay.as_secs());
                    if until_shutdown(&mut shutdown, tokio::time::sleep(delay))
                        .await
                        .is_none()
                    {
                        return SessionExit::Shutdown;
                    }
                }
            }
        }
    }
}

/// Drive `fut` unless shutdown is (or becomes) requested. A dropped sender
/// counts as a shutdown.
async fn until_shutdown<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = shutdown.wait_for(|stop| *stop) => None,
        out = fut => Some(out),
    }
}
