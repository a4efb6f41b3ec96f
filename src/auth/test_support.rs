// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed RSA keys, key sets and token builders shared by auth tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use super::error::KeyFetchError;
use super::jwks::{KeyCacheConfig, KeyResolver, KeySetSource};
use super::verifier::{BypassPolicy, PublicPath, TokenVerifier, VerifierConfig};

pub const ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_TESTPOOL";
pub const KID: &str = "test-key-1";

pub const SIGNING_KEY_PEM: &[u8] = include_bytes!("testdata/signing_key.pem");
pub const FOREIGN_KEY_PEM: &[u8] = include_bytes!("testdata/foreign_key.pem");

/// Modulus of `testdata/signing_key.pem`.
pub const SIGNING_KEY_N: &str = "uopFRgN6gsYONGM_V3xDA-BOiIPS_-O2OyJYZ8XPjLCwPQ8U2UkHCoKMTGAFBNHZAlnozUGZvhf_NQWgDUMO9zSZ3k1taJ3kL5VFt9ebXeAMGQgZDC--daRco0nEf0-zs5V7PawnsSXEMN7trXqtwuaVjux6KlOOXP0fW2rwOiD2nXURnEYsSQ5rA13ulbLroZCzD6hZQf4j9hDSD3KWh6gEzAnLGEtjrQ-A2gRwmoybQzpzXwugev4dr090CSeP7jRHOgwJzJVYQ7EEjMOnJwZi83T1PgTIIU0cVXQhZOHXWRoTfaXdIl8tZNL0tOCHJNSwjceykEg98A2Vyb9M5w";

pub fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "alg": "RS256",
        "use": "sig",
        "n": n,
        "e": "AQAB"
    })
}

/// A key set publishing the signing key under each of `kids`.
pub fn key_set(kids: &[&str]) -> JwkSet {
    let keys: Vec<Value> = kids.iter().map(|kid| rsa_jwk(kid, SIGNING_KEY_N)).collect();
    serde_json::from_value(json!({ "keys": keys })).unwrap()
}

pub fn numbered_kids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("kid-{i}")).collect()
}

/// In-process key set source that counts fetches.
pub struct StaticKeySource {
    result: Result<JwkSet, u16>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(jwks: JwkSet) -> Self {
        Self {
            result: Ok(jwks),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose endpoint always answers with `status`.
    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map_err(KeyFetchError::Status)
    }
}

pub fn verifier_with(source: Arc<StaticKeySource>) -> TokenVerifier {
    let resolver = Arc::new(KeyResolver::new(source, KeyCacheConfig::default()));
    TokenVerifier::new(
        resolver,
        VerifierConfig {
            issuer: ISSUER.to_string(),
            algorithm: Algorithm::RS256,
            audience: None,
            leeway_secs: 0,
        },
        BypassPolicy::new(vec![PublicPath::prefix("/health")]),
    )
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "iss": ISSUER,
        "exp": now() + 3600,
        "iat": now(),
        "token_use": "id",
        "aud": "client-1"
    })
}

pub fn sign_with(pem: &[u8], kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

/// Token signed by the published signing key.
pub fn sign(kid: &str, claims: &Value) -> String {
    sign_with(SIGNING_KEY_PEM, kid, claims)
}

/// Token with an arbitrary header and a junk signature segment.
pub fn forge(header: &Value, claims: &Value, signature: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap());
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{claims}.{signature}")
}
