// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        Application, ApplicationStats, CreateApplicationRequest, DeleteResponse,
        UpdateApplicationRequest,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/applications",
    tag = "Applications",
    responses(
        (status = 200, body = [Application]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_applications(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Application>>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.list_applications(&user.subject)))
}

#[utoipa::path(
    get,
    path = "/applications/stats",
    tag = "Applications",
    responses((status = 200, body = ApplicationStats))
)]
pub async fn application_stats(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ApplicationStats>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.application_stats(&user.subject)))
}

#[utoipa::path(
    get,
    path = "/applications/{app_id}",
    params(
        ("app_id" = String, Path, description = "Identifier of the application")
    ),
    tag = "Applications",
    responses(
        (status = 200, body = Application),
        (status = 404, description = "Application not found")
    )
)]
pub async fn get_application(
    Auth(user): Auth,
    Path(app_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Application>, ApiError> {
    let store = state.store.read().await;
    Ok(Json(store.get_application(&user.subject, &app_id)?))
}

#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationRequest,
    tag = "Applications",
    responses(
        (status = 201, body = Application),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_application(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let mut store = state.store.write().await;
    let item = store.create_application(&user.subject, request)?;
    tracing::info!(app_id = %item.app_id, "Application created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Partial update. Mounted on both PATCH and PUT.
#[utoipa::path(
    patch,
    path = "/applications/{app_id}",
    params(
        ("app_id" = String, Path, description = "Identifier of the application")
    ),
    request_body = UpdateApplicationRequest,
    tag = "Applications",
    responses(
        (status = 200, body = Application),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Application not found")
    )
)]
pub async fn update_application(
    Auth(user): Auth,
    Path(app_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<UpdateApplicationRequest>,
) -> Result<Json<Application>, ApiError> {
    let mut store = state.store.write().await;
    Ok(Json(store.update_application(&user.subject, &app_id, request)?))
}

#[utoipa::path(
    delete,
    path = "/applications/{app_id}",
    params(
        ("app_id" = String, Path, description = "Identifier of the application")
    ),
    tag = "Applications",
    responses(
        (status = 200, body = DeleteResponse),
        (status = 404, description = "Application not found")
    )
)]
pub async fn delete_application(
    Auth(user): Auth,
    Path(app_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let mut store = state.store.write().await;
    store.delete_application(&user.subject, &app_id)?;
    tracing::info!(app_id = %app_id, "Application deleted");
    Ok(Json(DeleteResponse { ok: true }))
}
