//! The referral aggregate.
//!
//! A referral owns its patient snapshot, clinical summary, notes, notifications and status
//! history. None of the embedded values has an identity of its own; they are only reachable
//! through their parent and only change through the parent's operations.

use crate::constants::{DEFAULT_ALLERGIES, DEFAULT_MEDICATIONS, MAX_PATIENT_AGE};
use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use crate::lifecycle::{ReferralStatus, StatusChange};
use chrono::{DateTime, NaiveDate, Utc};
use referral_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Validation(format!("unknown priority: {s}")))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub name: NonEmptyText,
    pub age: u16,
    pub medical_record_number: NonEmptyText,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalStatus {
    pub subjective: NonEmptyText,
    #[serde(default)]
    pub vital_signs: VitalSigns,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Labs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_date: Option<NaiveDate>,
    pub results: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Imaging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: NonEmptyText,
    pub description: NonEmptyText,
    pub findings: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medications {
    pub pre_hospital: NonEmptyText,
    pub in_hospital: NonEmptyText,
}

/// A free-text entry in a referral's collaboration thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub content: NonEmptyText,
    pub author_service_id: RecordId,
    pub author_name: NonEmptyText,
    pub created_at: DateTime<Utc>,
}

/// A system-generated event; `read` is its only mutable field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: RecordId,
    pub patient: Patient,
    pub requesting_service_id: RecordId,
    pub destination_service_id: RecordId,
    pub objective: NonEmptyText,
    pub clinical_history: NonEmptyText,
    pub clinical_status: ClinicalStatus,
    pub labs: Labs,
    pub imaging: Imaging,
    pub personal_history: NonEmptyText,
    pub family_history: NonEmptyText,
    pub allergies: NonEmptyText,
    pub medications: Medications,
    pub status: ReferralStatus,
    pub priority: Priority,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    /// Builds a new `PENDING` referral from validated request input.
    ///
    /// Service existence is checked by the caller against the service directory; this only
    /// enforces what can be decided from the input itself.
    pub fn create(input: NewReferral, now: DateTime<Utc>) -> CoreResult<Self> {
        if input.patient.age > MAX_PATIENT_AGE {
            return Err(CoreError::Validation(format!(
                "patient.age must be at most {MAX_PATIENT_AGE}"
            )));
        }
        if input.requesting_service_id == input.destination_service_id {
            return Err(CoreError::Validation(
                "requestingServiceId and destinationServiceId must differ".into(),
            ));
        }
        if let Some(status) = input.status {
            if status != ReferralStatus::Pending {
                return Err(CoreError::Validation(format!(
                    "new referrals start as PENDING, got {status}"
                )));
            }
        }

        let allergies = text_or_default(input.allergies, DEFAULT_ALLERGIES)?;
        let medications = input.medications.unwrap_or_default();
        let medications = Medications {
            pre_hospital: text_or_default(medications.pre_hospital, DEFAULT_MEDICATIONS)?,
            in_hospital: text_or_default(medications.in_hospital, DEFAULT_MEDICATIONS)?,
        };

        Ok(Self {
            id: RecordId::new(),
            patient: input.patient,
            requesting_service_id: input.requesting_service_id,
            destination_service_id: input.destination_service_id,
            objective: input.objective,
            clinical_history: input.clinical_history,
            clinical_status: input.clinical_status,
            labs: input.labs,
            imaging: input.imaging,
            personal_history: input.personal_history,
            family_history: input.family_history,
            allergies,
            medications,
            status: ReferralStatus::Pending,
            priority: input.priority.unwrap_or_default(),
            notes: Vec::new(),
            notifications: Vec::new(),
            status_history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Records a persisted mutation: stamps `updated_at` and advances `version`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    pub fn involves_service(&self, service_id: &RecordId) -> bool {
        self.requesting_service_id == *service_id || self.destination_service_id == *service_id
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

fn text_or_default(value: Option<String>, default: &str) -> CoreResult<NonEmptyText> {
    let value = value.filter(|v| !v.trim().is_empty());
    NonEmptyText::new(value.as_deref().unwrap_or(default))
        .map_err(|e| CoreError::validation("text", e))
}

/// Request payload for creating a referral.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    pub patient: Patient,
    pub requesting_service_id: RecordId,
    pub destination_service_id: RecordId,
    pub objective: NonEmptyText,
    pub clinical_history: NonEmptyText,
    pub clinical_status: ClinicalStatus,
    pub labs: Labs,
    pub imaging: Imaging,
    pub personal_history: NonEmptyText,
    pub family_history: NonEmptyText,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<NewMedications>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<ReferralStatus>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedications {
    #[serde(default)]
    pub pre_hospital: Option<String>,
    #[serde(default)]
    pub in_hospital: Option<String>,
}
