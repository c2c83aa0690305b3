//! User accounts: registration, login and admin management.

use super::require_active_service;
use crate::error::{CoreError, CoreResult};
use crate::identity::{
    hash_password, validate_password, verify_against_dummy, verify_password, TokenService,
};
use crate::ids::RecordId;
use crate::models::{Credentials, PasswordChange, Registration, User, UserSummary, UserUpdate};
use crate::policy::{self, Action};
use crate::principal::{AuthenticatedPrincipal, Role};
use crate::repositories::{ServiceRepository, UserRepository};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Successful login: a signed token plus the account it belongs to.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    services: Arc<dyn ServiceRepository>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        services: Arc<dyn ServiceRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            services,
            tokens,
        }
    }

    /// Self-registration. Requesting the `ADMIN` role is forbidden.
    pub fn register(&self, input: Registration) -> CoreResult<UserSummary> {
        if input.role == Some(Role::Admin) {
            return Err(CoreError::Forbidden(
                "administrator accounts cannot be self-registered".into(),
            ));
        }
        self.provision(input)
    }

    /// Creates an account with whatever role `input` names, `ADMIN` included.
    ///
    /// Only operator tooling calls this directly; request handlers go through [`Self::register`].
    pub fn provision(&self, input: Registration) -> CoreResult<UserSummary> {
        validate_password(&input.password)?;
        require_active_service(self.services.as_ref(), &input.service_id, "serviceId")?;

        let now = Utc::now();
        let user = self.users.create(User {
            id: RecordId::new(),
            name: input.name,
            email: input.email,
            password_hash: hash_password(&input.password)?,
            service_id: input.service_id,
            role: input.role.unwrap_or_default(),
            active: true,
            last_access_at: None,
            created_at: now,
            updated_at: now,
        })?;

        tracing::info!(user = %user.id, role = %user.role, service = %user.service_id, "user registered");
        Ok(user.summary())
    }

    /// Exchanges credentials for a token.
    ///
    /// Unknown email, deactivated account and wrong password all fail with the same
    /// `Unauthenticated` message.
    pub fn login(&self, credentials: Credentials) -> CoreResult<LoginOutcome> {
        let email = credentials.email.trim().to_lowercase();
        let user = match self.users.find_by_email(&email)? {
            Some(user) if user.active => user,
            _ => {
                verify_against_dummy(&credentials.password);
                tracing::warn!(%email, "login rejected: unknown or inactive account");
                return Err(CoreError::Unauthenticated(INVALID_CREDENTIALS.into()));
            }
        };
        if !verify_password(&credentials.password, &user.password_hash)? {
            tracing::warn!(%email, "login rejected: wrong password");
            return Err(CoreError::Unauthenticated(INVALID_CREDENTIALS.into()));
        }

        let now = Utc::now();
        let user = self.users.update_atomic(&user.id, &mut |u| {
            u.last_access_at = Some(now);
            Ok(())
        })?;
        let issued = self.tokens.issue(user.id, now)?;

        tracing::info!(user = %user.id, %email, "login succeeded");
        Ok(LoginOutcome {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.summary(),
        })
    }

    /// Every account, ordered by name.
    pub fn list_users(&self, principal: &AuthenticatedPrincipal) -> CoreResult<Vec<UserSummary>> {
        policy::authorize(principal, Action::ManageUsers)?;
        let mut users = self.users.list()?;
        users.sort_by_cached_key(|u| u.name.as_str().to_lowercase());
        Ok(users.iter().map(User::summary).collect())
    }

    pub fn update_user(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
        update: UserUpdate,
    ) -> CoreResult<UserSummary> {
        policy::authorize(principal, Action::ManageUsers)?;
        if let Some(service_id) = &update.service_id {
            require_active_service(self.services.as_ref(), service_id, "serviceId")?;
        }

        let now = Utc::now();
        let user = self.users.update_atomic(id, &mut |user| {
            if let Some(name) = &update.name {
                user.name = name.clone();
            }
            if let Some(email) = &update.email {
                user.email = email.clone();
            }
            if let Some(service_id) = update.service_id {
                user.service_id = service_id;
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            user.updated_at = now;
            Ok(())
        })?;

        tracing::info!(user = %user.id, actor = %principal.id, role = %user.role, "user updated");
        Ok(user.summary())
    }

    /// Soft-deletes (or restores) an account. Admins cannot deactivate themselves.
    pub fn set_active(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
        active: bool,
    ) -> CoreResult<UserSummary> {
        policy::authorize(principal, Action::ManageUsers)?;
        if !active && *id == principal.id {
            return Err(CoreError::Validation(
                "administrators cannot deactivate their own account".into(),
            ));
        }

        let now = Utc::now();
        let user = self.users.update_atomic(id, &mut |user| {
            user.active = active;
            user.updated_at = now;
            Ok(())
        })?;

        tracing::info!(user = %user.id, actor = %principal.id, active, "user activation changed");
        Ok(user.summary())
    }

    /// Changes the caller's own password after checking the current one.
    pub fn change_password(
        &self,
        principal: &AuthenticatedPrincipal,
        change: PasswordChange,
    ) -> CoreResult<()> {
        validate_password(&change.new_password)?;
        let user = self
            .users
            .find_by_id(&principal.id)?
            .ok_or_else(|| CoreError::NotFound(format!("user {} not found", principal.id)))?;
        if !verify_password(&change.current_password, &user.password_hash)? {
            return Err(CoreError::Unauthenticated(
                "current password is incorrect".into(),
            ));
        }

        let hash = hash_password(&change.new_password)?;
        let now = Utc::now();
        self.users.update_atomic(&user.id, &mut |u| {
            u.password_hash = hash.clone();
            u.updated_at = now;
            Ok(())
        })?;

        tracing::info!(user = %user.id, "password changed");
        Ok(())
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{fixture, Fixture, PASSWORD};
    use referral_types::{EmailAddress, NonEmptyText};

    fn accounts(fx: &Fixture) -> AccountService {
        AccountService::new(
            fx.storage.users.clone(),
            fx.storage.services.clone(),
            fx.tokens.clone(),
        )
    }

    fn registration(email: &str, service_id: RecordId, role: Option<Role>) -> Registration {
        Registration {
            name: NonEmptyText::new("Dr. Nuevo").unwrap(),
            email: EmailAddress::parse(email).unwrap(),
            password: "abcdef".into(),
            service_id,
            role,
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_then_login_stamps_last_access() {
        let fx = fixture();
        let accounts = accounts(&fx);
        let summary = accounts
            .register(registration("nuevo@hospital.org", fx.cardiology, None))
            .unwrap();
        assert_eq!(summary.role, Role::Medico);

        let outcome = accounts
            .login(credentials("  NUEVO@Hospital.org ", "abcdef"))
            .unwrap();
        assert_eq!(outcome.user.id, summary.id);
        assert_eq!(fx.tokens.verify(&outcome.token).unwrap(), summary.id);

        let stored = fx.storage.users.find_by_id(&summary.id).unwrap().unwrap();
        assert!(stored.last_access_at.is_some());
        assert_ne!(stored.password_hash, "abcdef");
    }

    #[test]
    fn login_failures_are_indistinguishable() {
        let fx = fixture();
        let accounts = accounts(&fx);
        accounts.set_active(&fx.admin, &fx.jefe.id, false).unwrap();

        let failures = [
            accounts.login(credentials("nobody@hospital.org", PASSWORD)),
            accounts.login(credentials("medico@hospital.org", "wrong-password")),
            accounts.login(credentials("jefe@hospital.org", PASSWORD)),
        ];
        for failure in failures {
            match failure {
                Err(CoreError::Unauthenticated(msg)) => assert_eq!(msg, INVALID_CREDENTIALS),
                other => panic!("expected Unauthenticated, got {other:?}"),
            }
        }
    }

    #[test]
    fn registration_rules() {
        let fx = fixture();
        let accounts = accounts(&fx);

        assert!(matches!(
            accounts.register(registration("x@hospital.org", fx.cardiology, Some(Role::Admin))),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            accounts.register(registration("medico@hospital.org", fx.cardiology, None)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            accounts.register(registration("y@hospital.org", RecordId::new(), None)),
            Err(CoreError::Validation(_))
        ));

        let mut short = registration("z@hospital.org", fx.cardiology, None);
        short.password = "12345".into();
        assert!(matches!(accounts.register(short), Err(CoreError::Validation(_))));

        let admin = accounts
            .provision(registration("root@hospital.org", fx.cardiology, Some(Role::Admin)))
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn user_management_is_admin_only() {
        let fx = fixture();
        let accounts = accounts(&fx);

        assert!(matches!(accounts.list_users(&fx.jefe), Err(CoreError::Forbidden(_))));
        assert!(matches!(
            accounts.set_active(&fx.medico, &fx.jefe.id, false),
            Err(CoreError::Forbidden(_))
        ));

        let users = accounts.list_users(&fx.admin).unwrap();
        assert_eq!(users.len(), 3);

        let promoted = accounts
            .update_user(
                &fx.admin,
                &fx.medico.id,
                UserUpdate {
                    role: Some(Role::JefeServicio),
                    service_id: Some(fx.cardiology),
                    ..UserUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(promoted.role, Role::JefeServicio);
        assert_eq!(promoted.service_id, fx.cardiology);
    }

    #[test]
    fn admin_cannot_deactivate_self_but_can_toggle_others() {
        let fx = fixture();
        let accounts = accounts(&fx);

        assert!(matches!(
            accounts.set_active(&fx.admin, &fx.admin.id, false),
            Err(CoreError::Validation(_))
        ));
        assert!(!accounts.set_active(&fx.admin, &fx.medico.id, false).unwrap().active);
        assert!(accounts.set_active(&fx.admin, &fx.medico.id, true).unwrap().active);
        assert!(matches!(
            accounts.set_active(&fx.admin, &RecordId::new(), true),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn change_password_requires_current_password() {
        let fx = fixture();
        let accounts = accounts(&fx);

        assert!(matches!(
            accounts.change_password(
                &fx.medico,
                PasswordChange {
                    current_password: "nope".into(),
                    new_password: "brand-new".into(),
                }
            ),
            Err(CoreError::Unauthenticated(_))
        ));

        accounts
            .change_password(
                &fx.medico,
                PasswordChange {
                    current_password: PASSWORD.into(),
                    new_password: "brand-new".into(),
                },
            )
            .unwrap();
        assert!(accounts.login(credentials("medico@hospital.org", "brand-new")).is_ok());
        assert!(accounts.login(credentials("medico@hospital.org", PASSWORD)).is_err());
    }
}
