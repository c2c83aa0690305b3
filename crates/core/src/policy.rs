//! Role-based authorization.
//!
//! The policy is a pure table from role to permitted actions. Scope checks (which service a
//! principal may look at) live next to the data they guard, in [`crate::filter`] and the
//! collaboration rules; this module only answers "may this role do this at all".

use crate::error::{CoreError, CoreResult};
use crate::principal::{AuthenticatedPrincipal, Role};
use std::fmt;

/// Operations gated by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    ListReferrals,
    ViewReferral,
    CreateReferral,
    AddNote,
    UpdateStatus,
    MarkNotificationsRead,
    SearchPatientHistory,
    /// List referrals across every service without a direction filter.
    ListAllReferrals,
    /// Query on behalf of a service other than the principal's own.
    ScopeAnyService,
    ManageUsers,
    ManageServices,
}

impl Action {
    const CLINICAL: [Action; 7] = [
        Action::ListReferrals,
        Action::ViewReferral,
        Action::CreateReferral,
        Action::AddNote,
        Action::UpdateStatus,
        Action::MarkNotificationsRead,
        Action::SearchPatientHistory,
    ];

    fn describe(&self) -> &'static str {
        match self {
            Self::ListReferrals => "list referrals",
            Self::ViewReferral => "view a referral",
            Self::CreateReferral => "create a referral",
            Self::AddNote => "add a note",
            Self::UpdateStatus => "update referral status",
            Self::MarkNotificationsRead => "mark notifications as read",
            Self::SearchPatientHistory => "search patient history",
            Self::ListAllReferrals => "list referrals across all services",
            Self::ScopeAnyService => "query another service's referrals",
            Self::ManageUsers => "manage user accounts",
            Self::ManageServices => "manage hospital services",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Returns whether `role` may perform `action`.
pub fn permits(role: Role, action: Action) -> bool {
    match role {
        Role::Admin => true,
        Role::Medico | Role::JefeServicio => Action::CLINICAL.contains(&action),
    }
}

/// Gates `action` for `principal`.
///
/// # Errors
///
/// Returns [`CoreError::Forbidden`] when the principal's role does not permit the action, or
/// [`CoreError::Unauthenticated`] if the principal has been deactivated.
pub fn authorize(principal: &AuthenticatedPrincipal, action: Action) -> CoreResult<()> {
    if !principal.active {
        return Err(CoreError::Unauthenticated(
            "user does not exist or is deactivated".into(),
        ));
    }
    if permits(principal.role, action) {
        Ok(())
    } else {
        tracing::warn!(
            principal = %principal.id,
            role = %principal.role,
            %action,
            "authorization denied"
        );
        Err(CoreError::Forbidden(format!(
            "role {} may not {}",
            principal.role, action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RecordId;

    fn principal(role: Role) -> AuthenticatedPrincipal {
        AuthenticatedPrincipal {
            id: RecordId::new(),
            name: "Dr. Test".into(),
            role,
            service_id: RecordId::new(),
            active: true,
        }
    }

    #[test]
    fn clinical_roles_may_work_with_referrals() {
        for role in [Role::Medico, Role::JefeServicio, Role::Admin] {
            for action in Action::CLINICAL {
                assert!(
                    authorize(&principal(role), action).is_ok(),
                    "{role} should be allowed to {action}"
                );
            }
        }
    }

    #[test]
    fn only_admin_lists_everything_and_manages_accounts() {
        for action in [
            Action::ListAllReferrals,
            Action::ScopeAnyService,
            Action::ManageUsers,
            Action::ManageServices,
        ] {
            assert!(authorize(&principal(Role::Admin), action).is_ok());
            for role in [Role::Medico, Role::JefeServicio] {
                assert!(matches!(
                    authorize(&principal(role), action),
                    Err(CoreError::Forbidden(_))
                ));
            }
        }
    }

    #[test]
    fn inactive_principal_is_never_authorized() {
        let mut admin = principal(Role::Admin);
        admin.active = false;
        assert!(matches!(
            authorize(&admin, Action::ViewReferral),
            Err(CoreError::Unauthenticated(_))
        ));
    }
}
