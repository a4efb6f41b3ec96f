// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::TokenVerifier;
use crate::store::InMemoryStore;

/// Shared by every handler. The verifier (and its key cache) is constructed
/// once at startup and injected here.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<InMemoryStore>>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(store: InMemoryStore, verifier: Arc<TokenVerifier>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            verifier,
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    fn default() -> Self {
        use crate::auth::test_support::{key_set, verifier_with, StaticKeySource, KID};

        let source = Arc::new(StaticKeySource::new(key_set(&[KID])));
        Self::new(InMemoryStore::new(), Arc::new(verifier_with(source)))
    }
}
