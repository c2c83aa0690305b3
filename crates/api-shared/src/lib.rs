//! # API Shared
//!
//! Shared wire definitions for the referral APIs.
//!
//! Contains:
//! - The success/failure response envelopes
//! - Bearer-token header parsing
//! - The `HealthService`
//!
//! Kept free of HTTP framework types so any transport can reuse it.

pub mod auth;
pub mod envelope;
pub mod health;

pub use envelope::{ApiSuccess, ErrorBody, SuccessBody};
pub use health::{HealthRes, HealthService};
