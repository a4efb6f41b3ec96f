// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side session errors.
//!
//! "Not signed in" is deliberately absent: it is a normal state, reported as
//! `Ok(None)` by identity queries and `SessionState::NoSession` by the
//! bootstrapper.

use std::time::Duration;

/// The identity provider (or its client library) failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("request to identity provider failed: {0}")]
    Request(String),
    #[error("identity provider answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected identity provider response: {0}")]
    Decode(String),
    #[error("no tokens held for this session")]
    NoTokens,
    /// The token endpoint rejected the grant with an OAuth error code.
    #[error("token endpoint rejected the grant: {0}")]
    Grant(String),
    /// A callback code arrived without the `state` of a login this client started.
    #[error("authorization state does not match a pending login")]
    StateMismatch,
}

/// Session establishment after a login redirect did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Every attempt ran without producing a session.
    #[error("no session after {attempts} attempts")]
    Timeout { attempts: u32 },
    /// The wall-clock ceiling fired before the attempts finished.
    #[error("session exchange exceeded {0:?}")]
    DeadlineExceeded(Duration),
    /// The provider redirected back with `error=...` instead of a code.
    #[error("identity provider returned {0}")]
    Callback(String),
    /// The callback's `state` does not belong to a login started here.
    #[error("callback state does not match a pending login")]
    StateMismatch,
    /// Looking up the established session failed.
    #[error("identity lookup failed: {0}")]
    Provider(ProviderError),
}

impl SessionError {
    /// Whether the user should be offered a retry because sign-in took too long.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. } | SessionError::DeadlineExceeded(_))
    }

    /// Message safe to show the user.
    pub fn user_message(&self) -> &'static str {
        if self.is_timeout() {
            "Authentication is taking too long. Please try signing in again."
        } else {
            "Sign in failed. Please try again."
        }
    }
}

/// Reading or writing navigation-surviving markers failed.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("marker storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("marker storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("marker storage unavailable: {0}")]
    Unavailable(String),
}
