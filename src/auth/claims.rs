// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified token claims and the identity attached to a request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from a verified Cognito token.
///
/// ID tokens carry `aud` and `email`; access tokens carry `client_id` and
/// usually no email. Both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject, the stable user identifier
    pub sub: String,

    /// Email address (ID tokens only)
    #[serde(default)]
    pub email: Option<String>,

    /// Issuer
    pub iss: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Audience, validated by the jsonwebtoken crate when configured
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// App client id (access tokens)
    #[serde(default)]
    pub client_id: Option<String>,

    /// `id` or `access`
    #[serde(default)]
    pub token_use: Option<String>,
}

/// Identity of the caller, attached to request extensions after a token
/// verifies. Handlers scope every store operation to `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestIdentity {
    /// Canonical user id (`sub` claim)
    pub subject: String,

    /// Email, when the token carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RequestIdentity {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
        }
    }
}
