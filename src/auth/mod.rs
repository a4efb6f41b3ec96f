// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token verification for the ApplyTrackr API.
//!
//! ## Auth Flow
//!
//! 1. The web client signs the user in through the Cognito hosted UI
//! 2. The client sends `Authorization: Bearer <Cognito JWT>`
//! 3. The server:
//!    - Resolves the token's `kid` against the user pool's JWKS (cached)
//!    - Verifies signature, algorithm (RS256 only), issuer and expiry
//!    - Attaches `sub` and `email` to the request as [`RequestIdentity`]
//!
//! ## Security
//!
//! - All routes except preflight and the public health path require a token
//! - The JWKS is fetched over HTTPS with a short timeout
//! - Rejections never reveal why a token failed; the reason is logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{RequestIdentity, TokenClaims};
pub use error::{AuthError, KeyFetchError, RejectReason};
pub use extractor::Auth;
pub use jwks::{HttpKeySetSource, KeyCacheConfig, KeyResolver, KeySetSource, SigningKey};
pub use middleware::auth_middleware;
pub use verifier::{BypassPolicy, PublicPath, TokenVerifier, VerifierConfig};
