// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Session Module
//!
//! The web client's side of authentication, independent of any UI toolkit.
//!
//! ## Flow
//!
//! 1. [`AuthFacade::sign_in`] records a [`PendingAuthorization`] (`state` and
//!    PKCE verifier) and redirects to the Cognito hosted UI
//! 2. The hosted UI redirects back with `?code=...&state=...`; a code whose
//!    `state` matches no pending login is never exchanged
//! 3. [`SessionBootstrapper::on_page_load`] polls the [`IdentityProvider`]
//!    until the code has been exchanged, under a hard deadline, then strips
//!    the callback parameters from the address bar
//! 4. [`AuthFacade::sign_out`] revokes, clears local tokens, persists where to
//!    go next and leaves through the provider's logout page
//!
//! The browser environment is reached only through [`Navigator`] and
//! [`MarkerStore`].

pub mod bootstrap;
pub mod error;
pub mod facade;
pub mod hosted_ui;
pub mod markers;
pub mod oauth;
pub mod provider;

#[cfg(test)]
pub(crate) mod test_support;

pub use bootstrap::{ensure_session, BootstrapConfig, SessionBootstrapper, SessionState};
pub use error::{MarkerError, ProviderError, SessionError};
pub use facade::{AuthFacade, AuthPhase, SIGNED_IN_PLACEHOLDER};
pub use hosted_ui::{AuthorizationRequest, HostedUi, Prompt};
pub use markers::{
    FileMarkerStore, MarkerStore, MemoryMarkerStore, PendingAuthorization, PendingLogoutRedirect,
};
pub use oauth::HostedUiProvider;
pub use provider::{IdentityProvider, Navigator, Session, UserAttributes};
