// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborators of the client-side auth code.
//!
//! The identity provider's client library owns token storage and the
//! code-for-token exchange; the host page owns navigation. Both sit behind
//! traits so the session logic can run against the browser, a native shell or
//! test doubles.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::error::ProviderError;

/// Tokens the provider holds for the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    email: Option<String>,
}

impl Session {
    /// A session counts once the provider has issued an ID token.
    pub fn is_established(&self) -> bool {
        self.id_token.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// The `email` claim of the ID token.
    ///
    /// The server verifies tokens; here the payload is only read for display.
    pub fn email_claim(&self) -> Option<String> {
        let id_token = self.id_token.as_deref()?;
        match jsonwebtoken::dangerous::insecure_decode::<IdTokenClaims>(id_token) {
            Ok(data) => data.claims.email.filter(|email| !email.is_empty()),
            Err(e) => {
                tracing::debug!(error = %e, "ID token payload unreadable");
                None
            }
        }
    }
}

/// Profile attributes from the provider's user-info lookup.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserAttributes {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

/// The identity provider's client library.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any. `force_refresh` bypasses cached tokens.
    async fn fetch_session(&self, force_refresh: bool) -> Result<Option<Session>, ProviderError>;

    /// Profile attributes of the signed-in user.
    async fn user_attributes(&self) -> Result<UserAttributes, ProviderError>;

    /// Ask the provider to terminate its own session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Drop every locally held token.
    async fn clear_local_session(&self);
}

/// The page the client code runs in.
pub trait Navigator: Send + Sync {
    fn current_url(&self) -> Url;

    /// Full page navigation. Local execution does not meaningfully continue.
    fn navigate(&self, url: &Url);

    /// Rewrite the address bar without navigating.
    fn replace_url(&self, url: &Url);
}
