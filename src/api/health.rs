// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health checks. Exempt from token verification.
//!
//! `/health` never leaves the process: it reports what the key resolver
//! already knows. Only `/health/ready` may fetch the key set, and that fetch
//! shares the resolver's refetch limit.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Whether the identity provider's signing keys are reachable
    /// ("ok", "unavailable", or "unchecked" before any fetch).
    pub jwks: String,
}

/// Simple health check response for liveness checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Cached keys or a recent successful fetch count as reachable.
async fn known_jwks_status(state: &AppState) -> &'static str {
    let resolver = state.verifier.resolver();
    if !resolver.is_empty().await {
        return "ok";
    }
    match resolver.last_fetch_succeeded().await {
        Some(true) => "ok",
        Some(false) => "unavailable",
        None => "unchecked",
    }
}

async fn checked_jwks_status(state: &AppState) -> &'static str {
    match state.verifier.resolver().check_reachable().await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Key set unreachable");
            "unavailable"
        }
    }
}

fn report(jwks: &str) -> (StatusCode, Json<ReadyResponse>) {
    let degraded = jwks == "unavailable";

    let response = ReadyResponse {
        status: if degraded { "degraded" } else { "ok" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            jwks: jwks.to_string(),
        },
    };

    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(response))
}

/// Health check endpoint handler.
///
/// Returns 503 only when the last key set fetch failed. Never fetches.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(known_jwks_status(&state).await)
}

/// Liveness check handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check handler.
///
/// Fetches the key set when no keys are cached, at most once per refetch
/// interval however many callers arrive.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(checked_jwks_status(&state).await)
}
