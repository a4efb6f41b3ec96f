// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read once at startup. Both halves read through a lookup
//! function so tests can inject values without touching the process
//! environment.
//!
//! ## Server
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `COGNITO_REGION` | User pool region | Required |
//! | `COGNITO_USER_POOL_ID` | User pool id | Required |
//! | `JWKS_URL` | Key set URL override | `<issuer>/.well-known/jwks.json` |
//! | `AUTH_AUDIENCE` | Expected `aud` / `client_id` | Not checked |
//! | `JWKS_CACHE_MAX_ENTRIES` | Cached signing keys | `10` |
//! | `JWKS_CACHE_MAX_AGE_SECS` | Signing key lifetime in cache | `600` |
//! | `JWKS_FETCH_TIMEOUT_SECS` | Key set fetch timeout | `5` |
//! | `JWKS_MIN_REFETCH_SECS` | Window reusing the last key set fetch | `5` |
//! | `JWT_LEEWAY_SECS` | Expiry clock skew | `0` |
//! | `PUBLIC_HEALTH_PATH` | Unauthenticated path (`=` prefix for exact) | `/health` |
//! | `CORS_ORIGIN` | Comma-separated allowed origins | Empty |
//! | `CORS_ALLOWED_HOST_SUFFIX` | Extra allowed host suffix | Unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! ## Client
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOSTED_UI_DOMAIN` | Hosted login domain | Required |
//! | `OAUTH_CLIENT_ID` | App client id | Required |
//! | `OAUTH_REDIRECT_URI` | Callback URL | Required |
//! | `OAUTH_SCOPES` | Requested scopes | `openid email profile` |
//! | `SESSION_MAX_ATTEMPTS` | Session attempts per bootstrap | `5` |
//! | `SESSION_RETRY_INTERVAL_MS` | Wait between attempts | `1000` |
//! | `SESSION_HARD_TIMEOUT_SECS` | Ceiling on the attempt loop | `15` |
//! | `SESSION_SETTLE_DELAY_MS` | Pause after a code exchange | `500` |

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::api::CorsPolicy;
use crate::auth::jwks::{
    is_secure_url, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_AGE, DEFAULT_MAX_ENTRIES,
    DEFAULT_MIN_REFETCH_INTERVAL,
};
use crate::auth::{
    BypassPolicy, HttpKeySetSource, KeyCacheConfig, KeyFetchError, KeyResolver, PublicPath,
    TokenVerifier, VerifierConfig,
};
use crate::client::{BootstrapConfig, HostedUi};
use crate::logging::LogFormat;

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_PATH: &str = "/health";
pub const DEFAULT_SCOPES: &str = "openid email profile";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
    #[error("key set URL must use https: {0}")]
    InsecureUrl(String),
    #[error("public path {0:?} would exempt every route")]
    BroadPublicPath(String),
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Display) -> Self {
        ConfigError::Invalid {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Everything the API server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub issuer: String,
    pub jwks_url: Url,
    pub audience: Option<String>,
    pub key_cache: KeyCacheConfig,
    pub leeway_secs: u64,
    pub public_paths: Vec<PublicPath>,
    pub cors: CorsPolicy,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let region = env.required("COGNITO_REGION")?;
        let pool_id = env.required("COGNITO_USER_POOL_ID")?;
        let issuer = cognito_issuer(&region, &pool_id);

        let jwks_url = match env.optional("JWKS_URL") {
            Some(url) => Url::parse(&url).map_err(|e| ConfigError::invalid("JWKS_URL", e))?,
            None => Url::parse(&format!("{issuer}/.well-known/jwks.json"))
                .map_err(|e| ConfigError::invalid("COGNITO_REGION", e))?,
        };
        if !is_secure_url(&jwks_url) {
            return Err(ConfigError::InsecureUrl(jwks_url.to_string()));
        }

        let max_entries = NonZeroUsize::new(env.parsed("JWKS_CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?)
            .ok_or_else(|| ConfigError::invalid("JWKS_CACHE_MAX_ENTRIES", "must be at least 1"))?;
        let max_age = Duration::from_secs(
            env.parsed("JWKS_CACHE_MAX_AGE_SECS", DEFAULT_MAX_AGE.as_secs())?,
        );
        let fetch_timeout = Duration::from_secs(
            env.parsed("JWKS_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT.as_secs())?,
        );
        if fetch_timeout.is_zero() {
            return Err(ConfigError::invalid("JWKS_FETCH_TIMEOUT_SECS", "must be positive"));
        }
        let min_refetch_interval = Duration::from_secs(env.parsed(
            "JWKS_MIN_REFETCH_SECS",
            DEFAULT_MIN_REFETCH_INTERVAL.as_secs(),
        )?);

        let public_path = env.or_default("PUBLIC_HEALTH_PATH", DEFAULT_PUBLIC_PATH);
        let public_paths = vec![parse_public_path(&public_path)?];

        let origins = env
            .optional("CORS_ORIGIN")
            .map(|v| v.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let cors = CorsPolicy::new(origins, env.optional("CORS_ALLOWED_HOST_SUFFIX"));

        let host: IpAddr = env.parsed("HOST", DEFAULT_HOST)?;
        let port: u16 = env.parsed("PORT", DEFAULT_PORT)?;

        Ok(Self {
            issuer,
            jwks_url,
            audience: env.optional("AUTH_AUDIENCE"),
            key_cache: KeyCacheConfig {
                max_entries,
                max_age,
                fetch_timeout,
                min_refetch_interval,
            },
            leeway_secs: env.parsed("JWT_LEEWAY_SECS", 0)?,
            public_paths,
            cors,
            bind_addr: SocketAddr::new(host, port),
            log_format: env
                .optional("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    /// The process-wide key resolver, fetching from [`ServerConfig::jwks_url`].
    pub fn key_resolver(&self) -> Result<Arc<KeyResolver>, ConfigError> {
        let source = HttpKeySetSource::new(self.jwks_url.clone(), self.key_cache.fetch_timeout)
            .map_err(|e| match e {
                KeyFetchError::InsecureUrl(url) => ConfigError::InsecureUrl(url),
                other => ConfigError::invalid("JWKS_URL", other),
            })?;
        Ok(Arc::new(KeyResolver::new(
            Arc::new(source),
            self.key_cache.clone(),
        )))
    }

    pub fn token_verifier(&self) -> Result<TokenVerifier, ConfigError> {
        Ok(TokenVerifier::new(
            self.key_resolver()?,
            VerifierConfig {
                issuer: self.issuer.clone(),
                algorithm: Algorithm::RS256,
                audience: self.audience.clone(),
                leeway_secs: self.leeway_secs,
            },
            BypassPolicy::new(self.public_paths.clone()),
        ))
    }
}

/// Settings for the browser-side session code.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub hosted_ui: HostedUi,
    pub bootstrap: BootstrapConfig,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let domain = env.required("HOSTED_UI_DOMAIN")?;
        let client_id = env.required("OAUTH_CLIENT_ID")?;
        let redirect_uri = Url::parse(&env.required("OAUTH_REDIRECT_URI")?)
            .map_err(|e| ConfigError::invalid("OAUTH_REDIRECT_URI", e))?;
        let scopes = env.or_default("OAUTH_SCOPES", DEFAULT_SCOPES);

        let hosted_ui = HostedUi::new(&domain, client_id, redirect_uri, scopes)
            .map_err(|e| ConfigError::invalid("HOSTED_UI_DOMAIN", e))?;

        let defaults = BootstrapConfig::default();
        let bootstrap = BootstrapConfig {
            max_attempts: env.parsed("SESSION_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_interval: Duration::from_millis(env.parsed(
                "SESSION_RETRY_INTERVAL_MS",
                defaults.retry_interval.as_millis() as u64,
            )?),
            hard_timeout: Duration::from_secs(
                env.parsed("SESSION_HARD_TIMEOUT_SECS", defaults.hard_timeout.as_secs())?,
            ),
            settle_delay: Duration::from_millis(env.parsed(
                "SESSION_SETTLE_DELAY_MS",
                defaults.settle_delay.as_millis() as u64,
            )?),
        };
        if bootstrap.max_attempts == 0 {
            return Err(ConfigError::invalid("SESSION_MAX_ATTEMPTS", "must be at least 1"));
        }
        if bootstrap.hard_timeout.is_zero() {
            return Err(ConfigError::invalid("SESSION_HARD_TIMEOUT_SECS", "must be positive"));
        }

        Ok(Self {
            hosted_ui,
            bootstrap,
        })
    }
}

/// `https://cognito-idp.<region>.amazonaws.com/<pool>`
pub fn cognito_issuer(region: &str, pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{pool_id}")
}

/// `=/path` is an exact match; anything else is a segment-aware prefix.
pub fn parse_public_path(value: &str) -> Result<PublicPath, ConfigError> {
    let value = value.trim();
    let (exact, path) = match value.strip_prefix('=') {
        Some(path) => (true, path.trim()),
        None => (false, value),
    };

    if !path.starts_with('/') {
        return Err(ConfigError::invalid(
            "PUBLIC_HEALTH_PATH",
            "must start with '/'",
        ));
    }

    if exact {
        Ok(PublicPath::exact(path))
    } else if path.trim_end_matches('/').is_empty() {
        Err(ConfigError::BroadPublicPath(value.to_string()))
    } else {
        Ok(PublicPath::prefix(path))
    }
}

/// Trimmed lookups; blank values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(name) {
            Some(raw) => raw.parse().map_err(|e| ConfigError::invalid(name, e)),
            None => Ok(default),
        }
    }
}
