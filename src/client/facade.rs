// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in, sign-up and sign-out entry points for the web client.
//!
//! ```text
//! SignedOut ─sign_in─▶ SigningIn ─(hosted UI)─▶ ExchangingCode ─▶ SignedIn
//! SignedIn ─sign_out─▶ LoggingOut ─(provider logout)─▶ SignedOut
//! ```
//!
//! Sign-out always goes through the provider's logout page. Clearing local
//! tokens alone leaves the hosted UI session alive and the next sign-in would
//! resume it silently. Because that page leaves the app, the destination after
//! logout is persisted as a [`PendingLogoutRedirect`] and consumed on the next
//! page load.
//!
//! Every login navigation first records its `state` and PKCE verifier as a
//! [`PendingAuthorization`]; the callback is only honored if it matches.

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use super::error::ProviderError;
use super::hosted_ui::{AuthorizationRequest, HostedUi, Prompt};
use super::markers::{MarkerStore, PendingAuthorization, PendingLogoutRedirect, FORCE_REPROMPT_KEY};
use super::provider::{IdentityProvider, Navigator, Session};

/// Shown when a session exists but no email could be found for it.
pub const SIGNED_IN_PLACEHOLDER: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    SignedOut,
    SigningIn,
    ExchangingCode,
    SignedIn,
    LoggingOut,
}

pub struct AuthFacade {
    hosted_ui: HostedUi,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    markers: Arc<dyn MarkerStore>,
    phase: watch::Sender<AuthPhase>,
}

impl AuthFacade {
    pub fn new(
        hosted_ui: HostedUi,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        markers: Arc<dyn MarkerStore>,
    ) -> Self {
        let (phase, _) = watch::channel(AuthPhase::SignedOut);
        Self {
            hosted_ui,
            provider,
            navigator,
            markers,
            phase,
        }
    }

    pub fn phase(&self) -> AuthPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<AuthPhase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, phase: AuthPhase) {
        self.phase.send_replace(phase);
    }

    pub fn hosted_ui(&self) -> &HostedUi {
        &self.hosted_ui
    }

    pub(crate) fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub(crate) fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub(crate) fn markers(&self) -> &dyn MarkerStore {
        self.markers.as_ref()
    }

    /// Persist the request's secrets and hand back where to navigate.
    fn remember(&self, request: AuthorizationRequest) -> Url {
        if let Err(e) = request.pending.record(self.markers.as_ref()) {
            tracing::warn!(error = %e, "Could not persist pending login");
        }
        request.url
    }

    /// Redirect to the hosted login page.
    ///
    /// Forces a credential prompt when the previous action was a logout.
    pub fn sign_in(&self) {
        let prompt = match self.markers.take(FORCE_REPROMPT_KEY) {
            Ok(Some(_)) => Prompt::Login,
            Ok(None) => Prompt::Default,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read re-prompt marker");
                Prompt::Default
            }
        };
        let destination = self.remember(self.hosted_ui.authorize_url(prompt));
        self.set_phase(AuthPhase::SigningIn);
        self.navigator.navigate(&destination);
    }

    pub fn sign_up(&self) {
        let destination = self.remember(self.hosted_ui.signup_url());
        self.set_phase(AuthPhase::SigningIn);
        self.navigator.navigate(&destination);
    }

    /// Log out at the provider, then come back to the app's home page.
    pub async fn sign_out(&self) {
        self.log_out_then(self.hosted_ui.app_home(), true).await;
    }

    /// Log out at the provider, then land on a login page that must prompt.
    pub async fn sign_in_with_different_account(&self) {
        let login = self.remember(self.hosted_ui.authorize_url(Prompt::Login));
        self.log_out_then(login, false).await;
    }

    async fn log_out_then(&self, destination: Url, reprompt_next_sign_in: bool) {
        self.set_phase(AuthPhase::LoggingOut);

        if let Err(e) = self.provider.sign_out().await {
            tracing::warn!(error = %e, "Provider sign-out failed; continuing logout");
        }
        self.provider.clear_local_session().await;

        if let Err(e) = PendingLogoutRedirect::record(self.markers.as_ref(), &destination) {
            tracing::warn!(error = %e, "Could not persist post-logout redirect");
        }
        if reprompt_next_sign_in {
            if let Err(e) = self.markers.set(FORCE_REPROMPT_KEY, "1") {
                tracing::warn!(error = %e, "Could not persist re-prompt marker");
            }
        }

        tracing::info!("Redirecting to provider logout");
        self.navigator.navigate(&self.hosted_ui.logout_url());
    }

    /// Consume a pending post-logout redirect.
    ///
    /// Returns `true` when a navigation was started and the caller should stop
    /// loading the page.
    pub fn run_post_logout_redirect(&self) -> bool {
        let destination = match PendingLogoutRedirect::take(self.markers.as_ref()) {
            Ok(Some(destination)) => destination,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read post-logout redirect");
                return false;
            }
        };

        self.set_phase(AuthPhase::SignedOut);
        if destination == self.navigator.current_url() {
            return false;
        }
        tracing::debug!(destination = %destination, "Following post-logout redirect");
        self.navigator.navigate(&destination);
        true
    }

    /// Display identity of the current user, or `None` when signed out.
    pub async fn current_identity(&self) -> Result<Option<String>, ProviderError> {
        match self.provider.fetch_session(false).await? {
            Some(session) if session.is_established() => {
                Ok(Some(self.display_identity(&session).await))
            }
            _ => Ok(None),
        }
    }

    /// Email claim, then the user-attributes email, then a placeholder.
    pub async fn display_identity(&self, session: &Session) -> String {
        if let Some(email) = session.email_claim() {
            return email;
        }

        match self.provider.user_attributes().await {
            Ok(attrs) => {
                if let Some(email) = attrs.email.filter(|e| !e.is_empty()) {
                    return email;
                }
            }
            Err(e) => tracing::debug!(error = %e, "User attribute lookup failed"),
        }

        SIGNED_IN_PLACEHOLDER.to_string()
    }
}
