// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the verified caller.
//!
//! Use the `Auth` extractor in handlers behind [`auth_middleware`]:
//!
//! ```rust,ignore
//! async fn list(Auth(user): Auth) -> impl IntoResponse {
//!     // user is RequestIdentity
//! }
//! ```
//!
//! [`auth_middleware`]: super::middleware::auth_middleware

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, RequestIdentity};

/// The identity the middleware attached to this request.
///
/// Rejects with [`AuthError::MissingToken`] when no identity is present,
/// which only happens for exempt routes or routes mounted outside the
/// middleware.
pub struct Auth(pub RequestIdentity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingToken)
    }
}
