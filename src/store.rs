// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory single-table store.
//!
//! Items are keyed by `(pk, sk)` in a `BTreeMap`, so listing one user's
//! applications is a range scan over their partition, ordered by sort key.
//! Every operation takes the caller's subject; there is no way to reach
//! another user's partition.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    app_sk, user_pk, Application, ApplicationStats, CreateApplicationRequest,
    UpdateApplicationRequest, APP_SK_PREFIX,
};

type Key = (String, String);

#[derive(Default)]
pub struct InMemoryStore {
    items: BTreeMap<Key, Application>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_applications(&self, subject: &str) -> Vec<Application> {
        let pk = user_pk(subject);
        self.items
            .range((pk.clone(), APP_SK_PREFIX.to_string())..)
            .take_while(|((item_pk, sk), _)| *item_pk == pk && sk.starts_with(APP_SK_PREFIX))
            .map(|(_, item)| item.clone())
            .collect()
    }

    pub fn application_stats(&self, subject: &str) -> ApplicationStats {
        ApplicationStats::tally(&self.list_applications(subject))
    }

    pub fn get_application(&self, subject: &str, app_id: &str) -> Result<Application, ApiError> {
        self.items
            .get(&(user_pk(subject), app_sk(app_id)))
            .cloned()
            .ok_or_else(|| ApiError::not_found("Application not found"))
    }

    pub fn create_application(
        &mut self,
        subject: &str,
        request: CreateApplicationRequest,
    ) -> Result<Application, ApiError> {
        request.validate()?;

        let app_id = Uuid::new_v4().to_string();
        let item = Application {
            pk: user_pk(subject),
            sk: app_sk(&app_id),
            app_id,
            company: request.company,
            role: request.role,
            status: request.status.unwrap_or_default(),
            applied_on: request.applied_on,
            notes: request.notes,
            resume_url: request.resume_url,
        };

        let key = (item.pk.clone(), item.sk.clone());
        if self.items.contains_key(&key) {
            return Err(ApiError::conflict("Application already exists"));
        }
        self.items.insert(key, item.clone());
        Ok(item)
    }

    /// Apply a partial update. An empty patch returns the current item.
    pub fn update_application(
        &mut self,
        subject: &str,
        app_id: &str,
        request: UpdateApplicationRequest,
    ) -> Result<Application, ApiError> {
        if request.is_empty() {
            return self.get_application(subject, app_id);
        }
        request.validate()?;

        let Some(item) = self.items.get_mut(&(user_pk(subject), app_sk(app_id))) else {
            return Err(ApiError::not_found("Application not found"));
        };
        request.apply_to(item);
        Ok(item.clone())
    }

    pub fn delete_application(&mut self, subject: &str, app_id: &str) -> Result<(), ApiError> {
        if self
            .items
            .remove(&(user_pk(subject), app_sk(app_id)))
            .is_some()
        {
            Ok(())
        } else {
            Err(ApiError::not_found("Application not found"))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use axum::http::StatusCode;

    fn create_request(company: &str) -> CreateApplicationRequest {
        CreateApplicationRequest {
            company: company.into(),
            role: "Engineer".into(),
            status: None,
            applied_on: Some("2026-02-01".into()),
            notes: None,
            resume_url: None,
        }
    }

    #[test]
    fn create_assigns_keys_and_default_status() {
        let mut store = InMemoryStore::new();
        let item = store.create_application("alice", create_request("Acme")).unwrap();

        assert_eq!(item.pk, "USER#alice");
        assert_eq!(item.sk, format!("APP#{}", item.app_id));
        assert_eq!(item.status, ApplicationStatus::Applied);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn create_rejects_invalid_request() {
        let mut store = InMemoryStore::new();
        let err = store
            .create_application("alice", create_request(" "))
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[test]
    fn listing_is_scoped_to_the_subject() {
        let mut store = InMemoryStore::new();
        store.create_application("alice", create_request("Acme")).unwrap();
        store.create_application("alice", create_request("Globex")).unwrap();
        store.create_application("bob", create_request("Initech")).unwrap();
        // A subject that sorts right after alice's partition.
        store.create_application("alice2", create_request("Hooli")).unwrap();

        let alice = store.list_applications("alice");
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|a| a.pk == "USER#alice"));
        assert_eq!(store.list_applications("bob").len(), 1);
        assert!(store.list_applications("carol").is_empty());
    }

    #[test]
    fn other_users_items_are_not_found() {
        let mut store = InMemoryStore::new();
        let item = store.create_application("alice", create_request("Acme")).unwrap();

        let err = store.get_application("bob", &item.app_id).unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(store.delete_application("bob", &item.app_id).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_is_partial_and_empty_patch_is_a_read() {
        let mut store = InMemoryStore::new();
        let item = store.create_application("alice", create_request("Acme")).unwrap();

        let unchanged = store
            .update_application("alice", &item.app_id, UpdateApplicationRequest::default())
            .unwrap();
        assert_eq!(unchanged, item);

        let updated = store
            .update_application(
                "alice",
                &item.app_id,
                UpdateApplicationRequest {
                    status: Some(ApplicationStatus::OnHold),
                    notes: Some("recruiter on leave".into()),
                    ..UpdateApplicationRequest::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ApplicationStatus::OnHold);
        assert_eq!(updated.company, "Acme");
        assert_eq!(updated.applied_on.as_deref(), Some("2026-02-01"));
        assert_eq!(store.get_application("alice", &item.app_id).unwrap(), updated);
    }

    #[test]
    fn update_and_delete_missing_item() {
        let mut store = InMemoryStore::new();
        let patch = UpdateApplicationRequest {
            role: Some("Manager".into()),
            ..UpdateApplicationRequest::default()
        };
        assert_eq!(
            store
                .update_application("alice", "missing", patch)
                .unwrap_err()
                .status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            store
                .update_application("alice", "missing", UpdateApplicationRequest::default())
                .unwrap_err()
                .status,
            StatusCode::NOT_FOUND
        );
        assert!(store.delete_application("alice", "missing").is_err());
    }

    #[test]
    fn stats_follow_updates_and_deletes() {
        let mut store = InMemoryStore::new();
        let first = store.create_application("alice", create_request("Acme")).unwrap();
        store.create_application("alice", create_request("Globex")).unwrap();
        store
            .update_application(
                "alice",
                &first.app_id,
                UpdateApplicationRequest {
                    status: Some(ApplicationStatus::Offer),
                    ..UpdateApplicationRequest::default()
                },
            )
            .unwrap();

        let stats = store.application_stats("alice");
        assert_eq!(stats.total, 2);
        assert_eq!(stats.offer, 1);
        assert_eq!(stats.applied, 1);

        store.delete_application("alice", &first.app_id).unwrap();
        assert_eq!(store.application_stats("alice").total, 1);
    }
}
