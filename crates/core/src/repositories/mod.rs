//! Persistence boundary.
//!
//! Application services only see the repository traits ([`ReferralRepository`],
//! [`UserRepository`], [`ServiceRepository`]). Both adapters are built on one generic
//! [`Collection`] contract, so unique-key enforcement and atomic read-modify-write behave the
//! same in memory and on disk:
//!
//! - [`memory::MemoryCollection`] keeps documents in a locked map (tests, CLI dry runs).
//! - [`file::JsonFileCollection`] keeps one JSON file per document in a sharded directory tree.

pub mod file;
pub mod memory;

use crate::constants::{REFERRALS_COLLECTION, SERVICES_COLLECTION, USERS_COLLECTION};
use crate::error::{CoreError, CoreResult};
use crate::filter::ReferralPredicate;
use crate::ids::RecordId;
use crate::models::{Referral, Service, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Mutation applied inside an atomic update. Returning an error aborts the update.
pub type Mutation<'a, T> = &'a mut dyn FnMut(&mut T) -> CoreResult<()>;

/// A stored aggregate.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Directory name of the collection inside the file store.
    const COLLECTION: &'static str;
    /// Human-readable noun used in `NotFound` messages.
    const LABEL: &'static str;

    fn id(&self) -> RecordId;

    /// `(field, normalised value)` pairs that must be unique across the collection.
    fn unique_keys(&self) -> Vec<(&'static str, String)>;
}

impl Document for Referral {
    const COLLECTION: &'static str = REFERRALS_COLLECTION;
    const LABEL: &'static str = "referral";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![(
            "patient.medicalRecordNumber",
            self.patient.medical_record_number.to_string(),
        )]
    }
}

impl Document for User {
    const COLLECTION: &'static str = USERS_COLLECTION;
    const LABEL: &'static str = "user";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.to_string())]
    }
}

impl Document for Service {
    const COLLECTION: &'static str = SERVICES_COLLECTION;
    const LABEL: &'static str = "service";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.as_str().to_lowercase()),
            ("headOfService.email", self.head_of_service.email.to_string()),
        ]
    }
}

/// Storage contract shared by both adapters.
pub trait Collection<T: Document>: Send + Sync {
    /// Inserts a new document, enforcing unique keys.
    fn insert(&self, doc: T) -> CoreResult<T>;

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>>;

    /// Every document, in no particular order.
    fn scan(&self) -> CoreResult<Vec<T>>;

    /// Read-modify-write of one document as a single step.
    ///
    /// The mutation runs on a copy; if it fails, or the result violates a unique key, the
    /// stored document is left unchanged.
    fn update(&self, id: &RecordId, mutation: Mutation<'_, T>) -> CoreResult<T>;

    /// Removes a document, returning whether it existed.
    fn remove(&self, id: &RecordId) -> CoreResult<bool>;
}

/// Fails with `Validation` if `candidate` shares a unique key with any other document.
pub(crate) fn ensure_unique<'a, T: Document>(
    candidate: &T,
    existing: impl IntoIterator<Item = &'a T>,
) -> CoreResult<()> {
    let keys = candidate.unique_keys();
    for other in existing {
        if other.id() == candidate.id() {
            continue;
        }
        for ((field, value), (_, other_value)) in keys.iter().zip(other.unique_keys()) {
            if *value == other_value {
                return Err(CoreError::Validation(format!(
                    "duplicate value for {field}: '{value}'"
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn not_found<T: Document>(id: &RecordId) -> CoreError {
    CoreError::NotFound(format!("{} {id} not found", T::LABEL))
}

// ============================================================================
// REPOSITORY TRAITS
// ============================================================================

pub trait ReferralRepository: Send + Sync {
    /// Persists a new referral. Duplicate medical record numbers fail with `Validation`.
    fn create(&self, referral: Referral) -> CoreResult<Referral>;
    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<Referral>>;
    /// Referrals matching `predicate`, unordered.
    fn find_many(&self, predicate: &ReferralPredicate) -> CoreResult<Vec<Referral>>;
    fn update_atomic(&self, id: &RecordId, mutation: Mutation<'_, Referral>)
        -> CoreResult<Referral>;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, user: User) -> CoreResult<User>;
    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<User>>;
    /// Lookup by normalised (lowercase) email.
    fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;
    fn list(&self) -> CoreResult<Vec<User>>;
    fn update_atomic(&self, id: &RecordId, mutation: Mutation<'_, User>) -> CoreResult<User>;
}

pub trait ServiceRepository: Send + Sync {
    fn create(&self, service: Service) -> CoreResult<Service>;
    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<Service>>;
    fn list(&self) -> CoreResult<Vec<Service>>;
    fn update_atomic(&self, id: &RecordId, mutation: Mutation<'_, Service>)
        -> CoreResult<Service>;
    fn delete(&self, id: &RecordId) -> CoreResult<()>;
}

impl<C: Collection<Referral>> ReferralRepository for C {
    fn create(&self, referral: Referral) -> CoreResult<Referral> {
        self.insert(referral)
    }

    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<Referral>> {
        self.get(id)
    }

    fn find_many(&self, predicate: &ReferralPredicate) -> CoreResult<Vec<Referral>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|r| predicate.matches(r))
            .collect())
    }

    fn update_atomic(
        &self,
        id: &RecordId,
        mutation: Mutation<'_, Referral>,
    ) -> CoreResult<Referral> {
        self.update(id, mutation)
    }
}

impl<C: Collection<User>> UserRepository for C {
    fn create(&self, user: User) -> CoreResult<User> {
        self.insert(user)
    }

    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<User>> {
        self.get(id)
    }

    fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .scan()?
            .into_iter()
            .find(|u| u.email.as_str() == email))
    }

    fn list(&self) -> CoreResult<Vec<User>> {
        self.scan()
    }

    fn update_atomic(&self, id: &RecordId, mutation: Mutation<'_, User>) -> CoreResult<User> {
        self.update(id, mutation)
    }
}

impl<C: Collection<Service>> ServiceRepository for C {
    fn create(&self, service: Service) -> CoreResult<Service> {
        self.insert(service)
    }

    fn find_by_id(&self, id: &RecordId) -> CoreResult<Option<Service>> {
        self.get(id)
    }

    fn list(&self) -> CoreResult<Vec<Service>> {
        self.scan()
    }

    fn update_atomic(
        &self,
        id: &RecordId,
        mutation: Mutation<'_, Service>,
    ) -> CoreResult<Service> {
        self.update(id, mutation)
    }

    fn delete(&self, id: &RecordId) -> CoreResult<()> {
        if self.remove(id)? {
            Ok(())
        } else {
            Err(not_found::<Service>(id))
        }
    }
}

// ============================================================================
// STORAGE HANDLE
// ============================================================================

/// The three repositories behind one handle.
///
/// Opened once at startup and shared by reference (`Arc`) with every service; dropping the last
/// clone releases the underlying store.
#[derive(Clone)]
pub struct Storage {
    pub referrals: Arc<dyn ReferralRepository>,
    pub users: Arc<dyn UserRepository>,
    pub services: Arc<dyn ServiceRepository>,
}

impl Storage {
    /// Opens (creating if missing) the sharded JSON store rooted at `data_dir`.
    pub fn open(data_dir: &Path) -> CoreResult<Self> {
        let store = file::JsonFileStore::open(data_dir)?;
        tracing::info!(data_dir = %data_dir.display(), "opened document store");
        Ok(Self {
            referrals: Arc::new(store.collection::<Referral>()),
            users: Arc::new(store.collection::<User>()),
            services: Arc::new(store.collection::<Service>()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            referrals: Arc::new(memory::MemoryCollection::<Referral>::new()),
            users: Arc::new(memory::MemoryCollection::<User>::new()),
            services: Arc::new(memory::MemoryCollection::<Service>::new()),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
