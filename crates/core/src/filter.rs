//! Referral query building.
//!
//! [`build_predicate`] turns caller-supplied filter parameters plus the principal's own service
//! and role into a [`ReferralPredicate`]. The predicate is evaluated by the repository; ordering
//! is applied afterwards by [`sort_newest_first`] and is not configurable.

use crate::error::CoreResult;
use crate::ids::RecordId;
use crate::lifecycle::ReferralStatus;
use crate::models::{Priority, Referral};
use crate::policy::{self, Action};
use crate::principal::AuthenticatedPrincipal;
use serde::de::value::StringDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer};

/// Which side of a referral the service scope applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Either side.
    #[default]
    None,
    /// The scope service requested the referral.
    #[serde(alias = "enviadas")]
    Sent,
    /// The scope service is the destination.
    #[serde(alias = "recibidas")]
    Received,
}

/// Filter parameters as supplied by a caller (query string or CLI flags).
///
/// Blank values (`?status=&priority=`) are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status: Option<ReferralStatus>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "blank_as_default")]
    pub direction: Direction,
    /// Explicit service scope. Only admins may name a service other than their own.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub service_id: Option<RecordId>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StringDeserializer<D::Error> = value.to_owned().into_deserializer();
            T::deserialize(value).map(Some)
        }
    }
}

fn blank_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    blank_as_none(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceMatch {
    #[default]
    Any,
    Requesting(RecordId),
    Destination(RecordId),
    Either(RecordId),
}

impl ServiceMatch {
    fn matches(&self, referral: &Referral) -> bool {
        match self {
            Self::Any => true,
            Self::Requesting(id) => referral.requesting_service_id == *id,
            Self::Destination(id) => referral.destination_service_id == *id,
            Self::Either(id) => referral.involves_service(id),
        }
    }
}

/// Conjunction of optional field constraints. The default value matches every referral.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferralPredicate {
    pub status: Option<ReferralStatus>,
    pub priority: Option<Priority>,
    pub service: ServiceMatch,
    pub medical_record_number: Option<String>,
}

impl ReferralPredicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_medical_record_number(mrn: &str) -> Self {
        Self {
            medical_record_number: Some(mrn.trim().to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, referral: &Referral) -> bool {
        self.status.map_or(true, |s| referral.status == s)
            && self.priority.map_or(true, |p| referral.priority == p)
            && self.service.matches(referral)
            && self
                .medical_record_number
                .as_deref()
                .map_or(true, |mrn| referral.patient.medical_record_number.as_str() == mrn)
    }
}

/// Builds the predicate for `params` on behalf of `principal`.
///
/// Scope resolution:
/// - `sent`/`received` scope to `params.service_id`, or the principal's own service when absent.
/// - `none` with an explicit scope matches referrals on either side of that service.
/// - `none` without a scope matches everything for an admin and the principal's own service
///   (either side) for everyone else.
///
/// # Errors
///
/// Returns [`crate::CoreError::Forbidden`] when a non-admin names a service other than their own.
pub fn build_predicate(
    params: &FilterParams,
    principal: &AuthenticatedPrincipal,
) -> CoreResult<ReferralPredicate> {
    if let Some(scope) = params.service_id {
        if scope != principal.service_id {
            policy::authorize(principal, Action::ScopeAnyService)?;
        }
    }

    let scope = params.service_id.unwrap_or(principal.service_id);
    let service = match params.direction {
        Direction::Sent => ServiceMatch::Requesting(scope),
        Direction::Received => ServiceMatch::Destination(scope),
        Direction::None if params.service_id.is_some() => ServiceMatch::Either(scope),
        Direction::None if principal.is_admin() => ServiceMatch::Any,
        Direction::None => ServiceMatch::Either(principal.service_id),
    };

    Ok(ReferralPredicate {
        status: params.status,
        priority: params.priority,
        service,
        medical_record_number: None,
    })
}

/// Orders referrals by `created_at` descending. Ties fall back to id so output is stable.
pub fn sort_newest_first(referrals: &mut [Referral]) {
    referrals.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
