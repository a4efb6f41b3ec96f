// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Runs the [`TokenVerifier`] in front of every route of the router it wraps.
//! Verified requests carry a [`RequestIdentity`](super::RequestIdentity) in their extensions; exempt
//! requests pass through without one; everything else is answered with 401
//! before reaching a handler.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/applications", get(list))
//!     .layer(axum::middleware::from_fn_with_state(verifier, auth_middleware));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::verifier::TokenVerifier;

/// Authentication middleware function.
pub async fn auth_middleware(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let verdict = verifier
        .verify_request(request.method(), request.uri().path(), request.headers())
        .await;

    match verdict {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::*;
    use crate::auth::Auth;
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Method, Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app(verifier: Arc<TokenVerifier>) -> Router {
        Router::new()
            .route("/applications", get(|Auth(user): Auth| async move { user.subject }))
            .route("/health", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(verifier, auth_middleware))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn verified_identity_reaches_handler() {
        let verifier = Arc::new(verifier_with(Arc::new(StaticKeySource::new(key_set(&[KID])))));
        let token = sign(KID, &claims("user_42"));

        let response = app(verifier)
            .oneshot(
                HttpRequest::builder()
                    .uri("/applications")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "user_42");
    }

    #[tokio::test]
    async fn unauthenticated_request_never_reaches_handler() {
        let verifier = Arc::new(verifier_with(Arc::new(StaticKeySource::new(key_set(&[KID])))));

        let response = app(verifier)
            .oneshot(HttpRequest::builder().uri("/applications").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("missing_token"));
    }

    #[tokio::test]
    async fn invalid_token_response_is_generic() {
        let verifier = Arc::new(verifier_with(Arc::new(StaticKeySource::new(key_set(&[KID])))));
        let token = sign_with(FOREIGN_KEY_PEM, "foreign-key", &claims("user_42"));

        let response = app(verifier)
            .oneshot(
                HttpRequest::builder()
                    .uri("/applications")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_text(response).await;
        assert_eq!(body, r#"{"error":"Invalid token","error_code":"invalid_token"}"#);
    }

    #[tokio::test]
    async fn health_route_is_public() {
        let verifier = Arc::new(verifier_with(Arc::new(StaticKeySource::failing(503))));

        let response = app(verifier)
            .oneshot(
                HttpRequest::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
