//! In-memory collection.

use super::{ensure_unique, not_found, Collection, Document, Mutation};
use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A collection held entirely in process memory behind one lock.
#[derive(Debug)]
pub struct MemoryCollection<T> {
    docs: Mutex<BTreeMap<RecordId, T>>,
}

impl<T: Document> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, BTreeMap<RecordId, T>>> {
        self.docs
            .lock()
            .map_err(|_| CoreError::Internal(format!("{} store lock poisoned", T::COLLECTION)))
    }
}

impl<T: Document> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> Collection<T> for MemoryCollection<T> {
    fn insert(&self, doc: T) -> CoreResult<T> {
        let mut docs = self.lock()?;
        if docs.contains_key(&doc.id()) {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists",
                T::LABEL,
                doc.id()
            )));
        }
        ensure_unique(&doc, docs.values())?;
        docs.insert(doc.id(), doc.clone());
        Ok(doc)
    }

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn scan(&self) -> CoreResult<Vec<T>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn update(&self, id: &RecordId, mutation: Mutation<'_, T>) -> CoreResult<T> {
        let mut docs = self.lock()?;
        let mut working = docs.get(id).cloned().ok_or_else(|| not_found::<T>(id))?;
        mutation(&mut working)?;
        ensure_unique(&working, docs.values())?;
        docs.insert(*id, working.clone());
        Ok(working)
    }

    fn remove(&self, id: &RecordId) -> CoreResult<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ReferralPredicate;
    use crate::models::referral::tests::{sample_new_referral, sample_referral};
    use crate::models::service::tests::sample_service;
    use crate::models::{Referral, Service};
    use crate::repositories::{ReferralRepository, ServiceRepository};
    use chrono::Utc;
    use referral_types::NonEmptyText;

    #[test]
    fn duplicate_medical_record_number_is_rejected_and_first_kept() {
        let repo = MemoryCollection::<Referral>::new();
        let first = repo.create(sample_referral()).unwrap();

        let second = Referral::create(
            sample_new_referral(RecordId::new(), RecordId::new(), "HC-0001"),
            Utc::now(),
        )
        .unwrap();
        let err = repo.create(second).expect_err("duplicate MRN");
        match err {
            CoreError::Validation(msg) => assert!(msg.contains("medicalRecordNumber")),
            other => panic!("expected validation error, got {other:?}"),
        }

        let all = repo.find_many(&ReferralPredicate::all()).unwrap();
        assert_eq!(all, vec![first]);
    }

    #[test]
    fn failed_mutation_persists_nothing() {
        let repo = MemoryCollection::<Referral>::new();
        let stored = repo.create(sample_referral()).unwrap();

        let err = repo
            .update_atomic(&stored.id, &mut |r| {
                r.objective = NonEmptyText::new("changed").unwrap();
                Err(CoreError::Conflict("stale".into()))
            })
            .expect_err("mutation fails");
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(repo.find_by_id(&stored.id).unwrap(), Some(stored));
    }

    #[test]
    fn update_of_missing_document_is_not_found() {
        let repo = MemoryCollection::<Referral>::new();
        let err = repo
            .update_atomic(&RecordId::new(), &mut |_| Ok(()))
            .expect_err("nothing stored");
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn service_name_uniqueness_ignores_case() {
        let repo = MemoryCollection::<Service>::new();
        repo.create(sample_service("Cardiología", "a@hospital.org"))
            .unwrap();
        let err = repo
            .create(sample_service("CARDIOLOGÍA", "b@hospital.org"))
            .expect_err("same name");
        assert!(matches!(err, CoreError::Validation(_)));

        let err = repo
            .create(sample_service("Neurología", "a@hospital.org"))
            .expect_err("same head email");
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn update_cannot_steal_another_documents_unique_key() {
        let repo = MemoryCollection::<Service>::new();
        repo.create(sample_service("Cirugía", "cx@hospital.org"))
            .unwrap();
        let other = repo
            .create(sample_service("Pediatría", "ped@hospital.org"))
            .unwrap();

        let err = repo
            .update_atomic(&other.id, &mut |s| {
                s.name = NonEmptyText::new("cirugía").unwrap();
                Ok(())
            })
            .expect_err("name taken");
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            repo.find_by_id(&other.id).unwrap().unwrap().name.as_str(),
            "Pediatría"
        );
    }

    #[test]
    fn delete_reports_missing_service() {
        let repo = MemoryCollection::<Service>::new();
        let service = repo
            .create(sample_service("Psiquiatría", "psi@hospital.org"))
            .unwrap();
        repo.delete(&service.id).unwrap();
        assert!(matches!(
            repo.delete(&service.id),
            Err(CoreError::NotFound(_))
        ));
    }
}
