// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-origin boundary for the browser client.
//!
//! Origins are allowed when listed exactly, or when their host ends with the
//! configured suffix (hosted preview deployments get a fresh subdomain each).
//! Requests without an `Origin` header are not affected.

use std::sync::Arc;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    request::Parts,
    HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPolicy {
    origins: Vec<String>,
    host_suffix: Option<String>,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>, host_suffix: Option<String>) -> Self {
        let origins = origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let host_suffix = host_suffix
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .map(|s| format!(".{s}"));
        Self {
            origins,
            host_suffix,
        }
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        if self.origins.iter().any(|allowed| allowed == origin) {
            return true;
        }
        let Some(suffix) = &self.host_suffix else {
            return false;
        };
        Url::parse(origin)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| host.ends_with(suffix.as_str()))
    }

    pub fn layer(self) -> CorsLayer {
        let policy = Arc::new(self);
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin
                        .to_str()
                        .map(|origin| policy.origin_allowed(origin))
                        .unwrap_or(false)
                },
            ))
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION])
    }
}
