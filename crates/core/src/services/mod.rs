//! Application services.
//!
//! Every operation runs the same pipeline: the caller supplies a principal already resolved by
//! [`crate::identity::IdentityResolver`], then the service authorizes the action, validates the
//! input against stored state and finally executes one repository call. Each step returns a
//! [`crate::CoreResult`] and the first failure ends the operation.

pub mod accounts;
pub mod directory;
pub mod referrals;

pub use accounts::{AccountService, LoginOutcome};
pub use directory::DirectoryService;
pub use referrals::{NewNote, ReferralService, StatusUpdate};

use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use crate::models::Service;
use crate::repositories::ServiceRepository;

/// Loads a service that must exist and be active, naming `field` in the validation message.
pub(crate) fn require_active_service(
    services: &dyn ServiceRepository,
    id: &RecordId,
    field: &str,
) -> CoreResult<Service> {
    match services.find_by_id(id)? {
        Some(service) if service.active => Ok(service),
        Some(_) => Err(CoreError::Validation(format!(
            "{field}: service {id} is inactive"
        ))),
        None => Err(CoreError::Validation(format!(
            "{field}: service {id} does not exist"
        ))),
    }
}
