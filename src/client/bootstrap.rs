// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session establishment after the hosted UI redirects back with a code.
//!
//! The token endpoint is not always consistent right after the redirect, so
//! the session is polled a bounded number of times. The polling loop races a
//! wall-clock deadline; whichever settles first decides the outcome.
//!
//! A code is only worked on when its `state` matches the login this client
//! started; anything else fails without contacting the provider.
//!
//! Whatever happens, the one-time callback parameters (`code`, `state`,
//! `error`, `error_description`) are removed from the address bar so that a
//! refresh never replays the exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::SessionError;
use super::facade::{AuthFacade, AuthPhase};
use super::markers::PendingAuthorization;
use super::oauth::authorization_code;
use super::provider::{IdentityProvider, Session};

/// Query parameters the hosted UI appends to the redirect URI.
const CALLBACK_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub max_attempts: u32,
    pub retry_interval: Duration,
    /// Ceiling on the whole attempt loop, independent of `max_attempts`.
    pub hard_timeout: Duration,
    /// Pause after a fresh exchange before the identity is read.
    pub settle_delay: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_interval: Duration::from_millis(1000),
            hard_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// What the page should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing decided yet.
    Checking,
    NoSession,
    ExchangingCode,
    Authenticated { email: String },
    Failed(SessionError),
}

/// Poll the provider until it reports an established session.
///
/// Only the first attempt forces a refresh. Waits `interval` between
/// attempts, never after the last one. At least one attempt is made.
pub async fn ensure_session(
    provider: &dyn IdentityProvider,
    max_attempts: u32,
    interval: Duration,
) -> Result<Session, SessionError> {
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        match provider.fetch_session(attempt == 1).await {
            Ok(Some(session)) if session.is_established() => {
                tracing::debug!(attempt, "Session established");
                return Ok(session);
            }
            Ok(_) => tracing::debug!(attempt, "No session yet"),
            Err(e) => tracing::debug!(attempt, error = %e, "Session check failed"),
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    tracing::warn!(attempts, "Session not established");
    Err(SessionError::Timeout { attempts })
}

/// Strip the callback parameters. `None` when there were none.
pub fn clean_callback_url(url: &Url) -> Option<Url> {
    let mut removed = false;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let name: &str = key;
            let callback = CALLBACK_PARAMS.contains(&name);
            removed |= callback;
            !callback
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !removed {
        return None;
    }

    let mut cleaned = url.clone();
    cleaned.set_query(None);
    if !kept.is_empty() {
        cleaned.query_pairs_mut().extend_pairs(kept);
    }
    Some(cleaned)
}

fn callback_error(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "error")
        .map(|(_, value)| value.into_owned())
}

/// Clears the in-flight flag when a page load finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives session establishment for page loads.
pub struct SessionBootstrapper {
    facade: Arc<AuthFacade>,
    config: BootstrapConfig,
    state: watch::Sender<SessionState>,
    in_flight: AtomicBool,
}

impl SessionBootstrapper {
    pub fn new(facade: Arc<AuthFacade>, config: BootstrapConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Checking);
        Self {
            facade,
            config,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn publish(&self, mounted: &CancellationToken, state: SessionState) {
        if mounted.is_cancelled() {
            return;
        }
        self.state.send_replace(state);
    }

    /// Run once per page load.
    ///
    /// `mounted` is the page's liveness; cancelling it abandons the load and
    /// nothing further is published. Returns `None` when the load was skipped
    /// (another is in flight, or a post-logout redirect took over) or
    /// abandoned.
    pub async fn on_page_load(&self, mounted: CancellationToken) -> Option<SessionState> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Session bootstrap already running");
            return None;
        }
        let _in_flight = InFlight(&self.in_flight);

        if self.facade.run_post_logout_redirect() {
            return None;
        }

        let navigator = self.facade.navigator();
        let page = navigator.current_url();

        let state = tokio::select! {
            _ = mounted.cancelled() => None,
            state = self.settle(&mounted, &page) => Some(state),
        }?;

        if mounted.is_cancelled() {
            return None;
        }

        if let Some(cleaned) = clean_callback_url(&page) {
            navigator.replace_url(&cleaned);
        }

        self.facade.set_phase(match state {
            SessionState::Authenticated { .. } => AuthPhase::SignedIn,
            _ => AuthPhase::SignedOut,
        });
        self.publish(&mounted, state.clone());
        Some(state)
    }

    async fn settle(&self, mounted: &CancellationToken, page: &Url) -> SessionState {
        if let Some(error) = callback_error(page) {
            tracing::warn!(error = %error, "Hosted UI returned an error");
            return SessionState::Failed(SessionError::Callback(error));
        }

        if authorization_code(page).is_some() {
            match PendingAuthorization::for_callback(self.facade.markers(), page) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!("Callback state matches no pending login");
                    return SessionState::Failed(SessionError::StateMismatch);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read pending login");
                    return SessionState::Failed(SessionError::StateMismatch);
                }
            }

            self.facade.set_phase(AuthPhase::ExchangingCode);
            self.publish(mounted, SessionState::ExchangingCode);

            let attempts = ensure_session(
                self.facade.provider(),
                self.config.max_attempts,
                self.config.retry_interval,
            );
            let session = match tokio::time::timeout(self.config.hard_timeout, attempts).await {
                Err(_) => {
                    tracing::warn!(
                        timeout = ?self.config.hard_timeout,
                        "Session exchange exceeded deadline"
                    );
                    return SessionState::Failed(SessionError::DeadlineExceeded(
                        self.config.hard_timeout,
                    ));
                }
                Ok(Err(e)) => return SessionState::Failed(e),
                Ok(Ok(session)) => session,
            };
            tokio::time::sleep(self.config.settle_delay).await;
            return SessionState::Authenticated {
                email: self.facade.display_identity(&session).await,
            };
        }

        match self.facade.current_identity().await {
            Ok(Some(email)) => SessionState::Authenticated { email },
            Ok(None) => SessionState::NoSession,
            Err(e) => {
                tracing::warn!(error = %e, "Identity lookup failed");
                SessionState::Failed(SessionError::Provider(e))
            }
        }
    }
}
