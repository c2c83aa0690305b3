//! Constants used throughout the referral core crate.

/// Default directory for the JSON document store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "referral_data";

/// Collection directory names inside the document store.
pub const REFERRALS_COLLECTION: &str = "referrals";
pub const USERS_COLLECTION: &str = "users";
pub const SERVICES_COLLECTION: &str = "services";

/// Filename of each stored document inside its sharded directory.
pub const DOCUMENT_FILENAME: &str = "document.json";

/// Value stored for `allergies` when the requester leaves it blank.
pub const DEFAULT_ALLERGIES: &str = "None known";

/// Value stored for either medications list when the requester leaves it blank.
pub const DEFAULT_MEDICATIONS: &str = "None";

pub const MAX_PATIENT_AGE: u16 = 150;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimum length, in bytes, of the HMAC secret used to sign access tokens.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Default access-token lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Longest accepted access-token lifetime (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;
