// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted collaborators shared by client tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::json;
use url::Url;

use super::error::{MarkerError, ProviderError};
use super::facade::AuthFacade;
use super::hosted_ui::HostedUi;
use super::markers::{MarkerStore, MemoryMarkerStore};
use super::provider::{IdentityProvider, Navigator, Session, UserAttributes};

pub const APP_URL: &str = "https://app.example.com/";
pub const HOSTED_UI_DOMAIN: &str = "auth.example.com";
pub const CLIENT_ID: &str = "client-1";

/// Unsigned ID token carrying `email` when given.
pub fn id_token(email: Option<&str>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let mut claims = json!({ "sub": "user-1", "exp": 4_102_444_800i64 });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }
    let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{header}.{claims}.c2lnbmF0dXJl")
}

pub fn session_with_email(email: Option<&str>) -> Session {
    Session {
        id_token: Some(id_token(email)),
        access_token: Some("access".to_string()),
        refresh_token: Some("refresh".to_string()),
        expires_at: None,
    }
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn hosted_ui() -> HostedUi {
    HostedUi::new(
        HOSTED_UI_DOMAIN,
        CLIENT_ID,
        url(APP_URL),
        "openid email profile",
    )
    .unwrap()
}

type FetchResult = Result<Option<Session>, ProviderError>;

/// Identity provider answering `fetch_session` from a script.
///
/// Once the script runs out every further fetch returns the fallback.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<FetchResult>>,
    fallback: FetchResult,
    fetch_delay: Option<Duration>,
    force_flags: Mutex<Vec<bool>>,
    attributes: Result<UserAttributes, ProviderError>,
    attribute_calls: AtomicUsize,
    sign_out_result: Result<(), ProviderError>,
    sign_outs: AtomicUsize,
    clears: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(None),
            fetch_delay: None,
            force_flags: Mutex::new(Vec::new()),
            attributes: Err(ProviderError::NoTokens),
            attribute_calls: AtomicUsize::new(0),
            sign_out_result: Ok(()),
            sign_outs: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    /// Provider that already holds `session`.
    pub fn signed_in(session: Session) -> Self {
        Self::new().otherwise(Ok(Some(session)))
    }

    pub fn then(self, result: FetchResult) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn otherwise(mut self, result: FetchResult) -> Self {
        self.fallback = result;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn with_attributes(mut self, result: Result<UserAttributes, ProviderError>) -> Self {
        self.attributes = result;
        self
    }

    pub fn with_sign_out_result(mut self, result: Result<(), ProviderError>) -> Self {
        self.sign_out_result = result;
        self
    }

    pub fn fetches(&self) -> usize {
        self.force_flags.lock().unwrap().len()
    }

    pub fn force_flags(&self) -> Vec<bool> {
        self.force_flags.lock().unwrap().clone()
    }

    pub fn attribute_calls(&self) -> usize {
        self.attribute_calls.load(Ordering::SeqCst)
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn fetch_session(&self, force_refresh: bool) -> FetchResult {
        self.force_flags.lock().unwrap().push(force_refresh);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn user_attributes(&self) -> Result<UserAttributes, ProviderError> {
        self.attribute_calls.fetch_add(1, Ordering::SeqCst);
        self.attributes.clone()
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.sign_out_result.clone()
    }

    async fn clear_local_session(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Navigator that records instead of leaving the page.
pub struct RecordingNavigator {
    current: Mutex<Url>,
    navigations: Mutex<Vec<Url>>,
    replacements: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn at(current: &str) -> Self {
        Self {
            current: Mutex::new(url(current)),
            navigations: Mutex::new(Vec::new()),
            replacements: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the browser arriving at `to` after a navigation.
    pub fn land(&self, to: &str) {
        *self.current.lock().unwrap() = url(to);
    }

    pub fn navigations(&self) -> Vec<Url> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn last_navigation(&self) -> Option<Url> {
        self.navigations.lock().unwrap().last().cloned()
    }

    pub fn replacements(&self) -> Vec<Url> {
        self.replacements.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_url(&self) -> Url {
        self.current.lock().unwrap().clone()
    }

    fn navigate(&self, url: &Url) {
        self.navigations.lock().unwrap().push(url.clone());
    }

    fn replace_url(&self, url: &Url) {
        *self.current.lock().unwrap() = url.clone();
        self.replacements.lock().unwrap().push(url.clone());
    }
}

/// Marker store whose backing storage is gone.
pub struct BrokenMarkerStore;

impl MarkerStore for BrokenMarkerStore {
    fn get(&self, _key: &str) -> Result<Option<String>, MarkerError> {
        Err(MarkerError::Unavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), MarkerError> {
        Err(MarkerError::Unavailable("storage disabled".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), MarkerError> {
        Err(MarkerError::Unavailable("storage disabled".to_string()))
    }
}

/// A facade wired to fresh test doubles, plus handles to inspect them.
pub struct Harness {
    pub facade: Arc<AuthFacade>,
    pub provider: Arc<ScriptedProvider>,
    pub navigator: Arc<RecordingNavigator>,
    pub markers: Arc<MemoryMarkerStore>,
}

pub fn harness(provider: ScriptedProvider, current: &str) -> Harness {
    let provider = Arc::new(provider);
    let navigator = Arc::new(RecordingNavigator::at(current));
    let markers = Arc::new(MemoryMarkerStore::new());
    let facade = Arc::new(AuthFacade::new(
        hosted_ui(),
        provider.clone(),
        navigator.clone(),
        markers.clone(),
    ));
    Harness {
        facade,
        provider,
        navigator,
        markers,
    }
}
