// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Callers only ever see two outcomes: the token is missing, or it is
//! invalid. The precise [`RejectReason`] travels inside
//! [`AuthError::InvalidToken`] so it can be logged, but it never reaches the
//! response body.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::Algorithm;
use serde::Serialize;

/// Authentication error type returned by the token verifier.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header, or one that is not `Bearer <token>`.
    #[error("Missing token")]
    MissingToken,
    /// The token failed verification. The reason is for diagnostics only.
    #[error("Invalid token")]
    InvalidToken(RejectReason),
}

/// Why a bearer token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum RejectReason {
    #[error("token is malformed")]
    Malformed,
    #[error("token header has no kid")]
    MissingKeyId,
    #[error("token declares {found:?}, expected {expected:?}")]
    UnexpectedAlgorithm {
        expected: Algorithm,
        found: Algorithm,
    },
    #[error("signing key unavailable: {0}")]
    KeyFetch(#[from] KeyFetchError),
    #[error("signing key {kid} is published for a different algorithm")]
    KeyAlgorithmMismatch { kid: String },
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("issuer does not match")]
    InvalidIssuer,
    #[error("audience does not match")]
    InvalidAudience,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("{0}")]
    Other(String),
}

/// The Key Resolver could not produce a signing key for a `kid`.
///
/// Always surfaces to callers as [`AuthError::InvalidToken`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyFetchError {
    #[error("key set request failed: {0}")]
    Request(String),
    #[error("key set endpoint returned HTTP {0}")]
    Status(u16),
    #[error("key set body could not be decoded: {0}")]
    Decode(String),
    #[error("key set fetch exceeded {0:?}")]
    Timeout(Duration),
    #[error("no key with kid {0} in key set")]
    UnknownKeyId(String),
    #[error("key {kid} is unusable: {reason}")]
    UnusableKey { kid: String, reason: String },
    #[error("key set URL must use https: {0}")]
    InsecureUrl(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken(_) => "invalid_token",
        }
    }

    /// Both variants are authentication failures.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// The internal reason, if any.
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            AuthError::MissingToken => None,
            AuthError::InvalidToken(reason) => Some(reason),
        }
    }
}

impl From<RejectReason> for AuthError {
    fn from(reason: RejectReason) -> Self {
        AuthError::InvalidToken(reason)
    }
}

impl From<KeyFetchError> for AuthError {
    fn from(err: KeyFetchError) -> Self {
        AuthError::InvalidToken(RejectReason::KeyFetch(err))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
