//! User accounts.

use crate::ids::RecordId;
use crate::principal::{AuthenticatedPrincipal, Role};
use chrono::{DateTime, Utc};
use referral_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};

/// Stored user record. The password hash never leaves the core; use [`UserSummary`] on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub password_hash: String,
    pub service_id: RecordId,
    pub role: Role,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_access_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal {
            id: self.id,
            name: self.name.to_string(),
            role: self.role,
            service_id: self.service_id,
            active: self.active,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.to_string(),
            email: self.email.to_string(),
            service_id: self.service_id,
            role: self.role,
            active: self.active,
        }
    }
}

/// Public view of a user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub service_id: RecordId,
    pub role: Role,
    pub active: bool,
}

/// Self-registration payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub password: String,
    pub service_id: RecordId,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Admin edit of a user account; absent fields are left as they are.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<NonEmptyText>,
    pub email: Option<EmailAddress>,
    pub service_id: Option<RecordId>,
    pub role: Option<Role>,
}
