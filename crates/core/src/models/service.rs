//! Hospital services (departments) that send and receive referrals.

use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use chrono::{DateTime, Utc};
use referral_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};

/// Specialty of a hospital service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    MedicinaInterna,
    Cirugia,
    Pediatria,
    Ginecologia,
    Cardiologia,
    Neurologia,
    Traumatologia,
    Psiquiatria,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        Self::MedicinaInterna,
        Self::Cirugia,
        Self::Pediatria,
        Self::Ginecologia,
        Self::Cardiologia,
        Self::Neurologia,
        Self::Traumatologia,
        Self::Psiquiatria,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicinaInterna => "MEDICINA_INTERNA",
            Self::Cirugia => "CIRUGIA",
            Self::Pediatria => "PEDIATRIA",
            Self::Ginecologia => "GINECOLOGIA",
            Self::Cardiologia => "CARDIOLOGIA",
            Self::Neurologia => "NEUROLOGIA",
            Self::Traumatologia => "TRAUMATOLOGIA",
            Self::Psiquiatria => "PSIQUIATRIA",
        }
    }

    pub fn parse(s: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::Validation(format!("unknown service type: {s}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadOfService {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub phone: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub description: NonEmptyText,
    pub head_of_service: HeadOfService,
    #[serde(rename = "type")]
    pub kind: ServiceType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a service.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: NonEmptyText,
    pub description: NonEmptyText,
    pub head_of_service: HeadOfService,
    #[serde(rename = "type")]
    pub kind: ServiceType,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Partial update for a service; absent fields are left as they are.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdate {
    pub name: Option<NonEmptyText>,
    pub description: Option<NonEmptyText>,
    pub head_of_service: Option<HeadOfService>,
    #[serde(rename = "type")]
    pub kind: Option<ServiceType>,
    pub active: Option<bool>,
}

impl Service {
    pub fn create(input: NewService, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            name: input.name,
            description: input.description,
            head_of_service: input.head_of_service,
            kind: input.kind,
            active: input.active.unwrap_or(true),
            created_at: now,
        }
    }

    pub fn apply(&mut self, update: ServiceUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(head) = update.head_of_service {
            self.head_of_service = head;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
    }
}
