// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hosted UI identity provider over plain HTTP.
//!
//! Plays the role the provider's client library plays in a browser:
//! exchanges the authorization code found in the page URL for tokens, keeps
//! them in memory, refreshes them on request and revokes the refresh token on
//! sign-out.
//!
//! A code is exchanged at most once, and only when the callback's `state`
//! matches the [`PendingAuthorization`] recorded by the login that produced
//! it. The exchange presents that login's PKCE verifier and consumes the
//! pending markers on success.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::{
    AuthType, AuthorizationCode, ClientId, EndpointNotSet, EndpointSet, ExtraTokenFields,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, StandardRevocableToken,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use super::error::ProviderError;
use super::hosted_ui::HostedUi;
use super::markers::{MarkerStore, PendingAuthorization};
use super::provider::{IdentityProvider, Navigator, Session, UserAttributes};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// The `code` query parameter of a redirect back from the hosted UI.
pub fn authorization_code(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// Cognito returns the ID token next to the standard OAuth fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

type CognitoTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type CognitoClient<HasTokenUrl = EndpointSet> = oauth2::Client<
    BasicErrorResponse,
    CognitoTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    HasTokenUrl,
>;

fn into_session(response: &CognitoTokenResponse, previous_refresh: Option<String>) -> Session {
    Session {
        id_token: response.extra_fields().id_token.clone(),
        access_token: Some(response.access_token().secret().clone()),
        refresh_token: response
            .refresh_token()
            .map(|token| token.secret().clone())
            .or(previous_refresh),
        expires_at: response
            .expires_in()
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl),
    }
}

fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> ProviderError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            ProviderError::Grant(response.error().to_string())
        }
        RequestTokenError::Request(e) => {
            ProviderError::Request(format!("token request failed: {e}"))
        }
        RequestTokenError::Parse(e, _) => {
            ProviderError::Decode(format!("invalid token response: {e}"))
        }
        RequestTokenError::Other(message) => ProviderError::Decode(message),
    }
}

pub struct HostedUiProvider {
    http: Client,
    oauth: CognitoClient,
    hosted_ui: HostedUi,
    navigator: Arc<dyn Navigator>,
    markers: Arc<dyn MarkerStore>,
    tokens: RwLock<Option<Session>>,
    /// Last code exchanged; held across the exchange request.
    exchanged_code: Mutex<Option<String>>,
}

impl HostedUiProvider {
    pub fn new(
        hosted_ui: HostedUi,
        navigator: Arc<dyn Navigator>,
        markers: Arc<dyn MarkerStore>,
    ) -> Result<Self, ProviderError> {
        // The token endpoint must answer directly.
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        let oauth = CognitoClient::<EndpointNotSet>::new(ClientId::new(
            hosted_ui.client_id().to_string(),
        ))
        .set_auth_type(AuthType::RequestBody)
        .set_token_uri(TokenUrl::from_url(hosted_ui.token_url()))
        .set_redirect_uri(RedirectUrl::from_url(hosted_ui.redirect_uri().clone()));

        Ok(Self {
            http,
            oauth,
            hosted_ui,
            navigator,
            markers,
            tokens: RwLock::new(None),
            exchanged_code: Mutex::new(None),
        })
    }

    pub fn hosted_ui(&self) -> &HostedUi {
        &self.hosted_ui
    }

    /// Exchange the callback's code unless it already was. `None` means
    /// nothing to do.
    async fn exchange_if_new(
        &self,
        callback: &Url,
        code: &str,
    ) -> Result<Option<Session>, ProviderError> {
        let mut exchanged = self.exchanged_code.lock().await;
        if exchanged.as_deref() == Some(code) {
            return Ok(None);
        }

        let pending = match PendingAuthorization::for_callback(self.markers.as_ref(), callback) {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                tracing::warn!("Refusing to exchange a code no pending login asked for");
                return Err(ProviderError::StateMismatch);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read pending login");
                return Err(ProviderError::StateMismatch);
            }
        };

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier))
            .request_async(&self.http)
            .await
            .map_err(token_error)?;

        let session = into_session(&response, None);
        *self.tokens.write().await = Some(session.clone());
        *exchanged = Some(code.to_string());
        if let Err(e) = PendingAuthorization::clear(self.markers.as_ref()) {
            tracing::warn!(error = %e, "Could not clear pending login");
        }
        tracing::info!("Authorization code exchanged");
        Ok(Some(session))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let token = RefreshToken::new(refresh_token.to_string());
        let response = self
            .oauth
            .exchange_refresh_token(&token)
            .request_async(&self.http)
            .await
            .map_err(token_error)?;

        let session = into_session(&response, Some(refresh_token.to_string()));
        *self.tokens.write().await = Some(session.clone());
        tracing::debug!("Session tokens refreshed");
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for HostedUiProvider {
    async fn fetch_session(&self, force_refresh: bool) -> Result<Option<Session>, ProviderError> {
        let page = self.navigator.current_url();
        if let Some(code) = authorization_code(&page) {
            if let Some(session) = self.exchange_if_new(&page, &code).await? {
                return Ok(Some(session));
            }
        }

        let Some(cached) = self.tokens.read().await.clone() else {
            return Ok(None);
        };

        let expired = cached.is_expired_at(Utc::now());
        if !force_refresh && !expired {
            return Ok(Some(cached));
        }

        match cached.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(refresh_token).await.map(Some),
            None if expired => Ok(None),
            None => Ok(Some(cached)),
        }
    }

    async fn user_attributes(&self) -> Result<UserAttributes, ProviderError> {
        let access_token = self
            .tokens
            .read()
            .await
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .ok_or(ProviderError::NoTokens)?;

        let response = self
            .http
            .get(self.hosted_ui.userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("invalid userinfo response: {e}")))
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let refresh_token = self
            .tokens
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return Ok(());
        };

        let response = self
            .http
            .post(self.hosted_ui.revoke_url())
            .form(&[
                ("token", refresh_token.as_str()),
                ("client_id", self.hosted_ui.client_id()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("revoke request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status, body });
        }
        Ok(())
    }

    async fn clear_local_session(&self) {
        *self.tokens.write().await = None;
    }
}
