//! Referral operations.

use super::require_active_service;
use crate::collaboration;
use crate::error::{CoreError, CoreResult};
use crate::filter::{self, Direction, FilterParams, ReferralPredicate};
use crate::ids::RecordId;
use crate::lifecycle::{self, ReferralStatus};
use crate::models::{NewReferral, Referral};
use crate::policy::{self, Action};
use crate::principal::AuthenticatedPrincipal;
use crate::repositories::Storage;
use chrono::Utc;
use referral_types::NonEmptyText;
use serde::Deserialize;

/// Requested status change.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: ReferralStatus,
    /// When present, the update fails with `Conflict` unless it matches the stored version.
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Note payload. Author fields default to the caller's own name and service.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub content: NonEmptyText,
    #[serde(default)]
    pub author_service_id: Option<RecordId>,
    #[serde(default)]
    pub author_name: Option<NonEmptyText>,
}

#[derive(Clone, Debug)]
pub struct ReferralService {
    storage: Storage,
}

impl ReferralService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn create(
        &self,
        principal: &AuthenticatedPrincipal,
        input: NewReferral,
    ) -> CoreResult<Referral> {
        policy::authorize(principal, Action::CreateReferral)?;

        let referral = Referral::create(input, Utc::now())?;
        require_active_service(
            self.storage.services.as_ref(),
            &referral.requesting_service_id,
            "requestingServiceId",
        )?;
        require_active_service(
            self.storage.services.as_ref(),
            &referral.destination_service_id,
            "destinationServiceId",
        )?;

        let referral = self.storage.referrals.create(referral)?;
        tracing::info!(
            referral = %referral.id,
            actor = %principal.id,
            requesting = %referral.requesting_service_id,
            destination = %referral.destination_service_id,
            priority = %referral.priority,
            "referral created"
        );
        Ok(referral)
    }

    pub fn get(&self, principal: &AuthenticatedPrincipal, id: &RecordId) -> CoreResult<Referral> {
        policy::authorize(principal, Action::ViewReferral)?;
        self.storage
            .referrals
            .find_by_id(id)?
            .ok_or_else(|| CoreError::NotFound(format!("referral {id} not found")))
    }

    /// FilterEngine query, newest first.
    pub fn filter(
        &self,
        principal: &AuthenticatedPrincipal,
        params: &FilterParams,
    ) -> CoreResult<Vec<Referral>> {
        policy::authorize(principal, Action::ListReferrals)?;
        let predicate = filter::build_predicate(params, principal)?;
        self.query(&predicate)
    }

    /// Referrals requested by `service_id`.
    pub fn sent(
        &self,
        principal: &AuthenticatedPrincipal,
        service_id: RecordId,
    ) -> CoreResult<Vec<Referral>> {
        self.filter(
            principal,
            &FilterParams {
                direction: Direction::Sent,
                service_id: Some(service_id),
                ..FilterParams::default()
            },
        )
    }

    /// Referrals addressed to `service_id`.
    pub fn received(
        &self,
        principal: &AuthenticatedPrincipal,
        service_id: RecordId,
    ) -> CoreResult<Vec<Referral>> {
        self.filter(
            principal,
            &FilterParams {
                direction: Direction::Received,
                service_id: Some(service_id),
                ..FilterParams::default()
            },
        )
    }

    /// Admin listing across every service, optionally narrowed to one service on either side.
    pub fn list_all(
        &self,
        principal: &AuthenticatedPrincipal,
        service_id: Option<RecordId>,
    ) -> CoreResult<Vec<Referral>> {
        policy::authorize(principal, Action::ListAllReferrals)?;
        self.filter(
            principal,
            &FilterParams {
                service_id,
                ..FilterParams::default()
            },
        )
    }

    pub fn update_status(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
        update: StatusUpdate,
    ) -> CoreResult<Referral> {
        policy::authorize(principal, Action::UpdateStatus)?;

        let mut from = None;
        let referral = self.storage.referrals.update_atomic(id, &mut |referral| {
            if let Some(expected) = update.expected_version {
                if referral.version != expected {
                    return Err(CoreError::Conflict(format!(
                        "referral {} is at version {}, expected {expected}",
                        referral.id, referral.version
                    )));
                }
            }
            from = Some(referral.status);
            lifecycle::transition(referral, update.status, principal.id, Utc::now())
        })?;

        tracing::info!(
            referral = %referral.id,
            actor = %principal.id,
            from = from.map(|s| s.as_str()).unwrap_or_default(),
            to = %referral.status,
            version = referral.version,
            "referral status changed"
        );
        Ok(referral)
    }

    pub fn add_note(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
        note: NewNote,
    ) -> CoreResult<Referral> {
        policy::authorize(principal, Action::AddNote)?;
        if self.storage.referrals.find_by_id(id)?.is_none() {
            return Err(CoreError::NotFound(format!("referral {id} not found")));
        }

        let author_service_id = note.author_service_id.unwrap_or(principal.service_id);
        if author_service_id != principal.service_id && !principal.is_admin() {
            return Err(CoreError::Forbidden(
                "notes may only be attributed to your own service".into(),
            ));
        }
        if self.storage.services.find_by_id(&author_service_id)?.is_none() {
            return Err(CoreError::Validation(format!(
                "authorServiceId: service {author_service_id} does not exist"
            )));
        }
        let author_name = match note.author_name {
            Some(name) => name,
            None => NonEmptyText::new(&principal.name)
                .map_err(|e| CoreError::validation("authorName", e))?,
        };

        let referral = self.storage.referrals.update_atomic(id, &mut |referral| {
            collaboration::append_note(
                referral,
                note.content.clone(),
                author_service_id,
                author_name.clone(),
                Utc::now(),
            );
            Ok(())
        })?;

        tracing::info!(
            referral = %referral.id,
            actor = %principal.id,
            notes = referral.notes.len(),
            "note added"
        );
        Ok(referral)
    }

    pub fn mark_notifications_read(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
    ) -> CoreResult<Referral> {
        policy::authorize(principal, Action::MarkNotificationsRead)?;

        let mut changed = 0;
        let referral = self.storage.referrals.update_atomic(id, &mut |referral| {
            changed = collaboration::mark_all_read(referral, Utc::now());
            Ok(())
        })?;

        tracing::info!(
            referral = %referral.id,
            actor = %principal.id,
            changed,
            "notifications marked read"
        );
        Ok(referral)
    }

    /// Every referral for a medical record number, newest first.
    pub fn search_history(
        &self,
        principal: &AuthenticatedPrincipal,
        medical_record_number: &str,
    ) -> CoreResult<Vec<Referral>> {
        policy::authorize(principal, Action::SearchPatientHistory)?;
        if medical_record_number.trim().is_empty() {
            return Err(CoreError::Validation(
                "medicalRecordNumber: Text cannot be empty".into(),
            ));
        }
        self.query(&ReferralPredicate::by_medical_record_number(
            medical_record_number,
        ))
    }

    fn query(&self, predicate: &ReferralPredicate) -> CoreResult<Vec<Referral>> {
        let mut referrals = self.storage.referrals.find_many(predicate)?;
        filter::sort_newest_first(&mut referrals);
        Ok(referrals)
    }
}
