// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ApplyTrackr - Job Application Tracker
//!
//! This crate provides the tracker's HTTP API, whose every request is
//! verified against the identity provider's rotating signing keys, and the
//! web client's session bootstrap and logout protocol.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token verification (Cognito JWT, cached JWKS)
//! - `client` - Hosted UI sign-in, session bootstrap, logout
//! - `store` - In-memory application store

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod store;
