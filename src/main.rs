// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc, time::Duration};

use applytrackr_server::{
    api::router, config::ServerConfig, logging::init_tracing, state::AppState,
    store::InMemoryStore,
};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    // Tracing is not up yet, so configuration problems go to stderr.
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(config.log_format) {
        eprintln!("Failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }

    let verifier = match config.token_verifier() {
        Ok(verifier) => Arc::new(verifier),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build token verifier");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        issuer = %config.issuer,
        jwks_url = %config.jwks_url,
        audience = ?config.audience,
        "Token verification configured"
    );

    let state = AppState::new(InMemoryStore::new(), verifier);
    let app = router(state, config.cors.clone());

    let handle: axum_server::Handle<std::net::SocketAddr> = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            }
        }
    });

    tracing::info!(addr = %config.bind_addr, "ApplyTrackr server listening (docs at /docs)");

    if let Err(e) = axum_server::bind(config.bind_addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
