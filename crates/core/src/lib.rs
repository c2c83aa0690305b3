//! # Referral Core
//!
//! Core business logic for tracking referrals (interconsultas) between hospital services.
//!
//! This crate contains the domain model and every rule that decides what an operation may do:
//! - Role-based authorization ([`policy`])
//! - The referral status state machine ([`lifecycle`])
//! - Direction/status/priority/service filtering ([`filter`])
//! - Append-only notes and notifications ([`collaboration`])
//! - Repository traits with in-memory and sharded JSON-file adapters ([`repositories`])
//! - Token issuance, password hashing and principal resolution ([`identity`])
//! - Application services composing the above ([`services`])
//!
//! **No API concerns**: HTTP routing, request extraction and response envelopes belong in
//! `api-rest` and `api-shared`.

pub mod collaboration;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod identity;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod principal;
pub mod repositories;
pub mod services;

pub use config::{token_ttl_from_env_value, CoreConfig, RunMode};
pub use error::{CoreError, CoreResult};
pub use filter::{Direction, FilterParams, ReferralPredicate, ServiceMatch};
pub use identity::{IdentityResolver, IssuedToken, TokenService};
pub use ids::RecordId;
pub use lifecycle::{ReferralStatus, StatusChange};
pub use models::{
    Credentials, NewReferral, NewService, Note, Notification, PasswordChange, Priority, Referral,
    Registration, Service, ServiceType, ServiceUpdate, User, UserSummary, UserUpdate,
};
pub use policy::Action;
pub use principal::{AuthenticatedPrincipal, Role};
pub use repositories::{
    ReferralRepository, ServiceRepository, Storage, UserRepository,
};
pub use services::{
    AccountService, DirectoryService, LoginOutcome, NewNote, ReferralService, StatusUpdate,
};

pub use referral_types::{EmailAddress, NonEmptyText, TextError};
