use crate::lifecycle::ReferralStatus;

/// Every failure a core operation can report.
///
/// The first seven variants form the public taxonomy; the storage and crypto variants carry
/// their underlying cause and are all reported to callers as `INTERNAL_ERROR`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cannot move referral from {from} to {to}")]
    InvalidTransition {
        from: ReferralStatus,
        to: ReferralStatus,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage I/O failed at {path}: {source}", path = path.display())]
    StorageIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize document: {0}")]
    StorageSerialization(serde_json::Error),
    #[error("stored document does not match schema at {path}: {message}")]
    StorageSchema { path: String, message: String },
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("token encoding failed: {0}")]
    Token(jsonwebtoken::errors::Error),
}

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_)
            | Self::StorageIo { .. }
            | Self::StorageSerialization(_)
            | Self::StorageSchema { .. }
            | Self::PasswordHash(_)
            | Self::Token(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error hides an unexpected failure rather than a caller mistake.
    pub fn is_internal(&self) -> bool {
        self.code() == "INTERNAL_ERROR"
    }

    /// Message safe to show to any caller.
    ///
    /// Internal failures collapse to a generic sentence; their cause is only exposed through
    /// [`CoreError::to_string`] (development details and logs).
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::InvalidTransition { .. } => self.to_string(),
            _ => "An internal error occurred".to_string(),
        }
    }

    pub(crate) fn validation(field: &str, err: referral_types::TextError) -> Self {
        Self::Validation(format!("{field}: {err}"))
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_classify_as_internal() {
        let err = CoreError::StorageIo {
            path: "/tmp/x".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(err.is_internal());
        assert_eq!(err.public_message(), "An internal error occurred");
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn domain_errors_keep_their_message() {
        let err = CoreError::Forbidden("scope outside own service".into());
        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(err.public_message(), "scope outside own service");
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = CoreError::InvalidTransition {
            from: ReferralStatus::Completed,
            to: ReferralStatus::Pending,
        };
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(
            err.public_message(),
            "cannot move referral from COMPLETED to PENDING"
        );
    }
}
