//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, MIN_TOKEN_SECRET_LEN};
use crate::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Whether the process runs with development conveniences (error details in responses).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Production,
    Development,
}

impl RunMode {
    /// Parses `REFERRALS_ENV`-style values. Anything other than `development`/`dev` is
    /// production.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "development" || v == "dev" => Self::Development,
            _ => Self::Production,
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    token_secret: String,
    token_ttl: Duration,
    run_mode: RunMode,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the token secret is shorter than
    /// [`MIN_TOKEN_SECRET_LEN`] bytes or the TTL is zero.
    pub fn new(
        data_dir: PathBuf,
        token_secret: String,
        token_ttl: Duration,
        run_mode: RunMode,
    ) -> CoreResult<Self> {
        if token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(CoreError::Validation(format!(
                "token secret must be at least {MIN_TOKEN_SECRET_LEN} bytes"
            )));
        }
        if token_ttl.is_zero() {
            return Err(CoreError::Validation("token TTL must be positive".into()));
        }
        if token_ttl.as_secs() > MAX_TOKEN_TTL_SECS {
            return Err(CoreError::Validation(format!(
                "token TTL must not exceed {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }

        Ok(Self {
            data_dir,
            token_secret,
            token_ttl,
            run_mode,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

/// Parse a token lifetime from an optional string value.
///
/// Accepts plain seconds (`"3600"`) or a number with a unit suffix: `s`, `m`, `h`, `d`
/// (`"30m"`, `"24h"`, `"7d"`). `None` or blank yields the 24 hour default. Lifetimes longer
/// than [`MAX_TOKEN_TTL_SECS`] are rejected.
pub fn token_ttl_from_env_value(value: Option<String>) -> CoreResult<Duration> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Ok(Duration::from_secs(DEFAULT_TOKEN_TTL_SECS));
    };

    let invalid = || CoreError::Validation(format!("invalid token lifetime: '{value}'"));

    let (digits, multiplier) = match value.chars().last() {
        Some('s') => (&value[..value.len() - 1], 1),
        Some('m') => (&value[..value.len() - 1], 60),
        Some('h') => (&value[..value.len() - 1], 60 * 60),
        Some('d') => (&value[..value.len() - 1], 24 * 60 * 60),
        _ => (value.as_str(), 1),
    };

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(invalid());
    }
    Ok(Duration::from_secs(secs))
}
