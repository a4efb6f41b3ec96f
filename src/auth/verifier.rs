// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! ## Order of checks
//!
//! 1. Preflight requests and configured public paths bypass verification
//! 2. `Authorization: Bearer <token>` must be present and non-empty
//! 3. The token header must declare exactly the expected algorithm and a `kid`
//! 4. The `kid` is resolved through the shared [`KeyResolver`]
//! 5. Signature, issuer, expiry (and audience, when configured) are validated
//!
//! Every failure after step 2 is reported as [`AuthError::InvalidToken`]; the
//! precise [`RejectReason`] is logged here and nowhere else.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap, Method};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{RequestIdentity, TokenClaims};
use super::error::{AuthError, RejectReason};
use super::jwks::KeyResolver;

/// A path that may be called without a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicPath {
    /// Matches only this exact path
    Exact(String),
    /// Matches this path and anything below it (`/health`, `/health/live`),
    /// but not siblings sharing the prefix (`/healthz`)
    Prefix(String),
}

impl PublicPath {
    pub fn exact(path: impl Into<String>) -> Self {
        PublicPath::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        PublicPath::Prefix(path.into().trim_end_matches('/').to_string())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PublicPath::Exact(exact) => path == exact,
            PublicPath::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

/// Requests exempt from verification.
#[derive(Debug, Clone, Default)]
pub struct BypassPolicy {
    public_paths: Vec<PublicPath>,
}

impl BypassPolicy {
    pub fn new(public_paths: Vec<PublicPath>) -> Self {
        Self { public_paths }
    }

    pub fn public_paths(&self) -> &[PublicPath] {
        &self.public_paths
    }

    pub fn allows(&self, method: &Method, path: &str) -> bool {
        *method == Method::OPTIONS || self.public_paths.iter().any(|p| p.matches(path))
    }
}

/// What a token must satisfy.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Exact expected `iss`
    pub issuer: String,
    /// The only accepted signing algorithm
    pub algorithm: Algorithm,
    /// Expected `aud` (ID tokens) or `client_id` (access tokens)
    pub audience: Option<String>,
    /// Clock skew tolerance for `exp`
    pub leeway_secs: u64,
}

/// Verifies inbound requests and yields the caller's identity.
pub struct TokenVerifier {
    resolver: Arc<KeyResolver>,
    config: VerifierConfig,
    bypass: BypassPolicy,
}

impl TokenVerifier {
    pub fn new(resolver: Arc<KeyResolver>, config: VerifierConfig, bypass: BypassPolicy) -> Self {
        Self {
            resolver,
            config,
            bypass,
        }
    }

    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }

    /// Verify a request.
    ///
    /// Returns `Ok(None)` for exempt requests, which carry no identity.
    pub async fn verify_request(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Option<RequestIdentity>, AuthError> {
        if self.bypass.allows(method, path) {
            return Ok(None);
        }

        let result = match bearer_token(headers) {
            Ok(token) => self.verify_token(token).await,
            Err(err) => Err(err),
        };

        match &result {
            Err(AuthError::MissingToken) => {
                tracing::debug!(%method, path, "Request without bearer token");
            }
            Err(AuthError::InvalidToken(reason)) => {
                tracing::warn!(%method, path, reason = %reason, "Rejected bearer token");
            }
            Ok(_) => {}
        }

        result.map(Some)
    }

    /// Verify a bare token.
    pub async fn verify_token(&self, token: &str) -> Result<RequestIdentity, AuthError> {
        let header = decode_header(token).map_err(|_| RejectReason::Malformed)?;

        let expected = self.config.algorithm;
        if header.alg != expected {
            return Err(RejectReason::UnexpectedAlgorithm {
                expected,
                found: header.alg,
            }
            .into());
        }

        let kid = header.kid.ok_or(RejectReason::MissingKeyId)?;
        let key = self.resolver.resolve(&kid).await?;
        if !key.permits(expected) {
            return Err(RejectReason::KeyAlgorithmMismatch { kid }.into());
        }

        let mut validation = Validation::new(expected);
        validation.set_issuer(&[&self.config.issuer]);
        validation.leeway = self.config.leeway_secs;
        // Cognito access tokens carry `client_id` instead of `aud`.
        validation.validate_aud = false;

        let claims = decode::<TokenClaims>(token, key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => RejectReason::Expired,
                ErrorKind::InvalidSignature => RejectReason::InvalidSignature,
                ErrorKind::InvalidIssuer => RejectReason::InvalidIssuer,
                ErrorKind::ImmatureSignature => RejectReason::NotYetValid,
                _ => RejectReason::Other(e.to_string()),
            })?
            .claims;

        if let Some(audience) = &self.config.audience {
            if !audience_matches(&claims, audience) {
                return Err(RejectReason::InvalidAudience.into());
            }
        }

        Ok(RequestIdentity::from_claims(claims))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

fn audience_matches(claims: &TokenClaims, expected: &str) -> bool {
    let in_aud = match &claims.aud {
        Some(serde_json::Value::String(aud)) => aud == expected,
        Some(serde_json::Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(expected)),
        _ => false,
    };
    in_aud || claims.client_id.as_deref() == Some(expected)
}
