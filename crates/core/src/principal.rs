//! The authenticated actor behind a request.

use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role held by a user account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Medico,
    JefeServicio,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medico => "MEDICO",
            Self::JefeServicio => "JEFE_SERVICIO",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses a role from its wire spelling (case-insensitive).
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "MEDICO" => Ok(Self::Medico),
            "JEFE_SERVICIO" => Ok(Self::JefeServicio),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(CoreError::Validation(format!("unknown role: {s}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal resolved from a bearer credential.
///
/// Only [`crate::identity::IdentityResolver`] produces these in request handling; the resolver
/// guarantees `active` is true for any principal it returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedPrincipal {
    pub id: RecordId,
    pub name: String,
    pub role: Role,
    pub service_id: RecordId,
    pub active: bool,
}

impl AuthenticatedPrincipal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
