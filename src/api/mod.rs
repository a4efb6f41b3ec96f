// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{auth_middleware, RequestIdentity},
    models::{
        Application, ApplicationStats, ApplicationStatus, CreateApplicationRequest,
        DeleteResponse, UpdateApplicationRequest,
    },
    state::AppState,
};

pub mod applications;
pub mod cors;
pub mod health;

pub use cors::CorsPolicy;

/// Every route except the docs runs behind [`auth_middleware`]; the health
/// routes pass only because the verifier's bypass policy exempts them.
pub fn router(state: AppState, cors: CorsPolicy) -> Router {
    let verifier = state.verifier.clone();

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/applications/stats", get(applications::application_stats))
        .route(
            "/applications/{app_id}",
            get(applications::get_application)
                .patch(applications::update_application)
                .put(applications::update_application)
                .delete(applications::delete_application),
        )
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(cors.layer())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        applications::list_applications,
        applications::application_stats,
        applications::get_application,
        applications::create_application,
        applications::update_application,
        applications::delete_application
    ),
    components(
        schemas(
            Application,
            ApplicationStatus,
            ApplicationStats,
            CreateApplicationRequest,
            UpdateApplicationRequest,
            DeleteResponse,
            RequestIdentity,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Applications", description = "Job applications of the signed-in user"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;
