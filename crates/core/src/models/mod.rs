//! Persisted documents and the request payloads that create or change them.

pub mod referral;
pub mod service;
pub mod user;

pub use referral::{
    ClinicalStatus, Imaging, Labs, Medications, NewMedications, NewReferral, Note, Notification,
    Patient, Priority, Referral, VitalSigns,
};
pub use service::{HeadOfService, NewService, Service, ServiceType, ServiceUpdate};
pub use user::{Credentials, PasswordChange, Registration, User, UserSummary, UserUpdate};
