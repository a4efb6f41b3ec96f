// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Markers that must survive a full page navigation.
//!
//! Logout leaves the application entirely, so anything it needs on return is
//! written here rather than held in memory. In a browser this is session
//! storage; natively it is a small JSON file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use url::Url;

use super::error::MarkerError;

/// Where the app goes once the logout round-trip lands back on it.
pub const POST_LOGOUT_REDIRECT_KEY: &str = "applytrackr.postLogoutRedirect";

/// Set by logout; the next sign-in forces the provider to prompt again.
pub const FORCE_REPROMPT_KEY: &str = "applytrackr.forceReprompt";

/// `state` sent with the last login request.
pub const OAUTH_STATE_KEY: &str = "applytrackr.oauthState";

/// PKCE verifier matching the challenge sent with the last login request.
pub const PKCE_VERIFIER_KEY: &str = "applytrackr.pkceVerifier";

/// Small string key-value storage that outlives a navigation.
pub trait MarkerStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, MarkerError>;
    fn set(&self, key: &str, value: &str) -> Result<(), MarkerError>;
    fn remove(&self, key: &str) -> Result<(), MarkerError>;

    /// Read and delete in one step.
    fn take(&self, key: &str) -> Result<Option<String>, MarkerError> {
        let value = self.get(key)?;
        if value.is_some() {
            self.remove(key)?;
        }
        Ok(value)
    }
}

/// Process-local store, for tests and hosts that never unload.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, MarkerError> {
        self.entries
            .lock()
            .map_err(|_| MarkerError::Unavailable("marker lock poisoned".to_string()))
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn get(&self, key: &str) -> Result<Option<String>, MarkerError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MarkerError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MarkerError> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>, MarkerError> {
        Ok(self.entries()?.remove(key))
    }
}

/// JSON-file store. Writes go to a sibling temp file and are renamed into
/// place.
#[derive(Debug)]
pub struct FileMarkerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<HashMap<String, String>, MarkerError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &HashMap<String, String>) -> Result<(), MarkerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, MarkerError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| MarkerError::Unavailable("marker lock poisoned".to_string()))?;
        let mut entries = self.read()?;
        let out = f(&mut entries);
        self.write(&entries)?;
        Ok(out)
    }
}

impl MarkerStore for FileMarkerStore {
    fn get(&self, key: &str) -> Result<Option<String>, MarkerError> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MarkerError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), MarkerError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn take(&self, key: &str) -> Result<Option<String>, MarkerError> {
        self.update(|entries| entries.remove(key))
    }
}

/// The single deferred post-logout destination.
///
/// Recording overwrites any earlier destination; taking it deletes it even
/// when the stored value turns out to be unusable.
pub struct PendingLogoutRedirect;

impl PendingLogoutRedirect {
    pub fn record(store: &dyn MarkerStore, destination: &Url) -> Result<(), MarkerError> {
        store.set(POST_LOGOUT_REDIRECT_KEY, destination.as_str())
    }

    pub fn take(store: &dyn MarkerStore) -> Result<Option<Url>, MarkerError> {
        let Some(raw) = store.take(POST_LOGOUT_REDIRECT_KEY)? else {
            return Ok(None);
        };
        match Url::parse(&raw) {
            Ok(url) => Ok(Some(url)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable post-logout redirect");
                Ok(None)
            }
        }
    }

    pub fn is_pending(store: &dyn MarkerStore) -> Result<bool, MarkerError> {
        Ok(store.get(POST_LOGOUT_REDIRECT_KEY)?.is_some())
    }
}

/// A login sent to the hosted UI and not yet completed.
///
/// Only a callback carrying the same `state` may be exchanged, and the
/// exchange must present the matching PKCE verifier. A newer login overwrites
/// the older one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub pkce_verifier: String,
}

impl PendingAuthorization {
    pub fn record(&self, store: &dyn MarkerStore) -> Result<(), MarkerError> {
        store.set(OAUTH_STATE_KEY, &self.state)?;
        store.set(PKCE_VERIFIER_KEY, &self.pkce_verifier)
    }

    pub fn load(store: &dyn MarkerStore) -> Result<Option<Self>, MarkerError> {
        let (Some(state), Some(pkce_verifier)) =
            (store.get(OAUTH_STATE_KEY)?, store.get(PKCE_VERIFIER_KEY)?)
        else {
            return Ok(None);
        };
        Ok(Some(Self {
            state,
            pkce_verifier,
        }))
    }

    /// The pending login whose `state` equals the one `callback` carries.
    pub fn for_callback(
        store: &dyn MarkerStore,
        callback: &Url,
    ) -> Result<Option<Self>, MarkerError> {
        let returned = callback
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned());
        let Some(returned) = returned.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        Ok(Self::load(store)?.filter(|pending| pending.state == returned))
    }

    pub fn clear(store: &dyn MarkerStore) -> Result<(), MarkerError> {
        store.remove(OAUTH_STATE_KEY)?;
        store.remove(PKCE_VERIFIER_KEY)
    }
}
