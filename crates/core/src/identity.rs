//! Identity: access tokens, password hashing and principal resolution.
//!
//! Tokens are HS256 JWTs whose `sub` is the user's [`RecordId`]. A valid signature is not enough
//! to act: [`IdentityResolver::resolve`] reloads the user on every request so deactivation takes
//! effect immediately.

use crate::config::CoreConfig;
use crate::constants::MIN_PASSWORD_LEN;
use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use crate::principal::AuthenticatedPrincipal;
use crate::repositories::UserRepository;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A freshly signed access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: std::time::Duration) -> CoreResult<Self> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CoreError::Validation(format!("token TTL out of range: {e}")))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        Self::new(cfg.token_secret(), cfg.token_ttl())
    }

    pub fn issue(&self, user_id: RecordId, now: DateTime<Utc>) -> CoreResult<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| CoreError::Internal("token expiry out of range".into()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(CoreError::Token)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the user id carried by `token`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Unauthenticated`] for a bad signature, malformed token or expired token.
    pub fn verify(&self, token: &str) -> CoreResult<RecordId> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            CoreError::Unauthenticated("invalid or expired token".into())
        })?;
        RecordId::parse(&data.claims.sub)
            .map_err(|_| CoreError::Unauthenticated("invalid or expired token".into()))
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PASSWORDS
// ============================================================================

pub fn validate_password(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hashes `password` with Argon2 and a random salt (PHC string format).
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> CoreResult<bool> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|e| CoreError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::PasswordHash(e.to_string())),
    }
}

/// Argon2 hash of a password no account uses, made with the same parameters as real hashes.
fn dummy_password_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("no-such-account-password").ok())
        .as_deref()
}

/// Spends one full password verification when there is no account to check against, so login
/// for an unknown email costs the same as a wrong password.
pub(crate) fn verify_against_dummy(password: &str) {
    if let Some(hash) = dummy_password_hash() {
        let _ = verify_password(password, hash);
    }
}

// ============================================================================
// PRINCIPAL RESOLUTION
// ============================================================================

/// Turns a bearer token into an [`AuthenticatedPrincipal`].
#[derive(Clone)]
pub struct IdentityResolver {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepository>,
}

impl IdentityResolver {
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserRepository>) -> Self {
        Self { tokens, users }
    }

    /// # Errors
    ///
    /// [`CoreError::Unauthenticated`] when the token is absent, malformed or expired, or when the
    /// user it names no longer exists or is deactivated.
    pub fn resolve(&self, bearer: Option<&str>) -> CoreResult<AuthenticatedPrincipal> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::Unauthenticated("no access token provided".into()))?;
        let user_id = self.tokens.verify(token)?;

        match self.users.find_by_id(&user_id)? {
            Some(user) if user.active => Ok(user.principal()),
            _ => Err(CoreError::Unauthenticated(
                "user does not exist or is deactivated".into(),
            )),
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
