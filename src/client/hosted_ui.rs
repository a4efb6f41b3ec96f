// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! URLs of the provider-operated login, sign-up and logout pages.
//!
//! Login and sign-up requests carry a fresh `state` and an S256 PKCE
//! challenge. Both secrets come back in the returned [`AuthorizationRequest`]
//! and must be persisted before navigating away.

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope};
use url::Url;

use super::markers::PendingAuthorization;

/// Whether the hosted login page may reuse an existing provider session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Provider decides; a live session is resumed silently.
    Default,
    /// Always ask for credentials (`prompt=login`).
    Login,
}

/// Where to send the browser, and what to remember until it comes back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub pending: PendingAuthorization,
}

/// Endpoints of a Cognito hosted UI domain for one app client.
#[derive(Debug, Clone)]
pub struct HostedUi {
    base: Url,
    client_id: String,
    redirect_uri: Url,
    scopes: String,
}

impl HostedUi {
    /// `domain` may be a bare host (`auth.example.com`) or a full base URL.
    pub fn new(
        domain: &str,
        client_id: impl Into<String>,
        redirect_uri: Url,
        scopes: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let domain = domain.trim().trim_end_matches('/');
        let base = if domain.contains("://") {
            Url::parse(domain)?
        } else {
            Url::parse(&format!("https://{domain}"))?
        };

        Ok(Self {
            base,
            client_id: client_id.into(),
            redirect_uri,
            scopes: scopes.into(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scopes
            .split_whitespace()
            .map(|scope| Scope::new(scope.to_string()))
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    fn code_flow(&self, path: &str, prompt: Prompt) -> AuthorizationRequest {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(AuthUrl::from_url(self.endpoint(path)))
            .set_redirect_uri(RedirectUrl::from_url(self.redirect_uri.clone()));

        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes())
            .set_pkce_challenge(challenge);
        if prompt == Prompt::Login {
            request = request.add_extra_param("prompt", "login");
        }
        let (url, state) = request.url();

        AuthorizationRequest {
            url,
            pending: PendingAuthorization {
                state: state.secret().clone(),
                pkce_verifier: verifier.secret().clone(),
            },
        }
    }

    pub fn authorize_url(&self, prompt: Prompt) -> AuthorizationRequest {
        self.code_flow("/oauth2/authorize", prompt)
    }

    pub fn signup_url(&self) -> AuthorizationRequest {
        self.code_flow("/signup", Prompt::Default)
    }

    /// Provider logout, returning to the application origin afterwards.
    ///
    /// The origin has no trailing slash; it must match the registered sign-out
    /// URL byte for byte.
    pub fn logout_url(&self) -> Url {
        let mut url = self.endpoint("/logout");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", &self.app_origin());
        url
    }

    pub fn token_url(&self) -> Url {
        self.endpoint("/oauth2/token")
    }

    pub fn userinfo_url(&self) -> Url {
        self.endpoint("/oauth2/userInfo")
    }

    pub fn revoke_url(&self) -> Url {
        self.endpoint("/oauth2/revoke")
    }

    /// Origin of the redirect URI, e.g. `https://app.example.com`.
    pub fn app_origin(&self) -> String {
        self.redirect_uri.origin().ascii_serialization()
    }

    /// Root page of the application.
    pub fn app_home(&self) -> Url {
        let mut home = self.redirect_uri.clone();
        home.set_path("/");
        home.set_query(None);
        home.set_fragment(None);
        home
    }
}
