// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the applications API. Field names are
//! camelCase on the wire, matching what the web client sends.
//!
//! ## Storage keys
//!
//! Items live in a single table keyed by:
//! - `pk` = `USER#<sub>`: the verified caller owning the item
//! - `sk` = `APP#<appId>`: the application

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::error::ApiError;

pub fn user_pk(subject: &str) -> String {
    format!("USER#{subject}")
}

pub fn app_sk(app_id: &str) -> String {
    format!("APP#{app_id}")
}

/// Prefix shared by every application sort key.
pub const APP_SK_PREFIX: &str = "APP#";

/// Where an application stands.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
    #[serde(rename = "On Hold")]
    OnHold,
}

/// A tracked job application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// `USER#<sub>`
    pub pk: String,
    /// `APP#<appId>`
    pub sk: String,
    pub app_id: String,
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
    /// ISO date, as entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

/// Request to track a new application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationRequest {
    pub company: String,
    pub role: String,
    /// Defaults to `Applied`.
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub applied_on: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl CreateApplicationRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_non_empty("company", &self.company)?;
        require_non_empty("role", &self.role)?;
        validate_resume_url(self.resume_url.as_deref())
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub applied_on: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl UpdateApplicationRequest {
    pub fn is_empty(&self) -> bool {
        self.company.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.applied_on.is_none()
            && self.notes.is_none()
            && self.resume_url.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(company) = &self.company {
            require_non_empty("company", company)?;
        }
        if let Some(role) = &self.role {
            require_non_empty("role", role)?;
        }
        validate_resume_url(self.resume_url.as_deref())
    }

    /// Copy every present field onto `item`.
    pub fn apply_to(self, item: &mut Application) {
        if let Some(company) = self.company {
            item.company = company;
        }
        if let Some(role) = self.role {
            item.role = role;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(applied_on) = self.applied_on {
            item.applied_on = Some(applied_on);
        }
        if let Some(notes) = self.notes {
            item.notes = Some(notes);
        }
        if let Some(resume_url) = self.resume_url {
            item.resume_url = Some(resume_url);
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_resume_url(value: Option<&str>) -> Result<(), ApiError> {
    match value {
        Some(raw) if Url::parse(raw).is_err() => {
            Err(ApiError::bad_request("resumeUrl must be a valid URL"))
        }
        _ => Ok(()),
    }
}

/// Count of applications per status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ApplicationStats {
    pub total: usize,
    #[serde(rename = "Applied")]
    pub applied: usize,
    #[serde(rename = "Interview")]
    pub interview: usize,
    #[serde(rename = "Offer")]
    pub offer: usize,
    #[serde(rename = "Rejected")]
    pub rejected: usize,
    #[serde(rename = "On Hold")]
    pub on_hold: usize,
}

impl ApplicationStats {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a Application>) -> Self {
        let mut stats = Self::default();
        for item in items {
            stats.total += 1;
            match item.status {
                ApplicationStatus::Applied => stats.applied += 1,
                ApplicationStatus::Interview => stats.interview += 1,
                ApplicationStatus::Offer => stats.offer += 1,
                ApplicationStatus::Rejected => stats.rejected += 1,
                ApplicationStatus::OnHold => stats.on_hold += 1,
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(company: &str, role: &str) -> CreateApplicationRequest {
        CreateApplicationRequest {
            company: company.into(),
            role: role.into(),
            status: None,
            applied_on: None,
            notes: None,
            resume_url: None,
        }
    }

    #[test]
    fn on_hold_uses_display_name_on_the_wire() {
        assert_eq!(
            serde_json::to_value(ApplicationStatus::OnHold).unwrap(),
            json!("On Hold")
        );
        let parsed: ApplicationStatus = serde_json::from_value(json!("On Hold")).unwrap();
        assert_eq!(parsed, ApplicationStatus::OnHold);
        assert!(serde_json::from_value::<ApplicationStatus>(json!("Ghosted")).is_err());
    }

    #[test]
    fn create_request_reads_camel_case() {
        let req: CreateApplicationRequest = serde_json::from_value(json!({
            "company": "Acme",
            "role": "Engineer",
            "appliedOn": "2026-01-15",
            "resumeUrl": "https://cdn.example.com/cv.pdf"
        }))
        .unwrap();
        assert_eq!(req.applied_on.as_deref(), Some("2026-01-15"));
        assert!(req.status.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_validation() {
        assert!(request("", "Engineer").validate().is_err());
        assert!(request("Acme", "   ").validate().is_err());

        let mut bad_url = request("Acme", "Engineer");
        bad_url.resume_url = Some("not a url".into());
        assert_eq!(
            bad_url.validate().unwrap_err().message,
            "resumeUrl must be a valid URL"
        );
    }

    #[test]
    fn update_applies_only_present_fields() {
        let mut item = Application {
            pk: user_pk("u"),
            sk: app_sk("a"),
            app_id: "a".into(),
            company: "Acme".into(),
            role: "Engineer".into(),
            status: ApplicationStatus::Applied,
            applied_on: None,
            notes: Some("first call".into()),
            resume_url: None,
        };

        let patch = UpdateApplicationRequest {
            status: Some(ApplicationStatus::Interview),
            ..UpdateApplicationRequest::default()
        };
        assert!(!patch.is_empty());
        patch.apply_to(&mut item);

        assert_eq!(item.status, ApplicationStatus::Interview);
        assert_eq!(item.company, "Acme");
        assert_eq!(item.notes.as_deref(), Some("first call"));
        assert!(UpdateApplicationRequest::default().is_empty());
    }

    #[test]
    fn stats_count_every_status() {
        let make = |status| Application {
            pk: user_pk("u"),
            sk: app_sk("a"),
            app_id: "a".into(),
            company: "c".into(),
            role: "r".into(),
            status,
            applied_on: None,
            notes: None,
            resume_url: None,
        };
        let items = vec![
            make(ApplicationStatus::Applied),
            make(ApplicationStatus::Applied),
            make(ApplicationStatus::OnHold),
        ];

        let stats = ApplicationStats::tally(&items);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.on_hold, 1);
        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!({
                "total": 3, "Applied": 2, "Interview": 0,
                "Offer": 0, "Rejected": 0, "On Hold": 1
            })
        );
    }
}
