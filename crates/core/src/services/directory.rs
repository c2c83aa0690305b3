//! Hospital service directory. Reads are public; changes require an admin.

use crate::error::{CoreError, CoreResult};
use crate::ids::RecordId;
use crate::models::{NewService, Service, ServiceUpdate};
use crate::policy::{self, Action};
use crate::principal::AuthenticatedPrincipal;
use crate::repositories::ServiceRepository;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct DirectoryService {
    services: Arc<dyn ServiceRepository>,
}

impl DirectoryService {
    pub fn new(services: Arc<dyn ServiceRepository>) -> Self {
        Self { services }
    }

    /// All services ordered by name.
    pub fn list(&self) -> CoreResult<Vec<Service>> {
        let mut services = self.services.list()?;
        sort_by_name(&mut services);
        Ok(services)
    }

    pub fn get(&self, id: &RecordId) -> CoreResult<Service> {
        self.services
            .find_by_id(id)?
            .ok_or_else(|| CoreError::NotFound(format!("service {id} not found")))
    }

    /// Services whose name contains `fragment`, ignoring case.
    pub fn search(&self, fragment: &str) -> CoreResult<Vec<Service>> {
        let needle = fragment.trim().to_lowercase();
        let mut services: Vec<Service> = self
            .services
            .list()?
            .into_iter()
            .filter(|s| s.name.as_str().to_lowercase().contains(&needle))
            .collect();
        sort_by_name(&mut services);
        Ok(services)
    }

    pub fn create(
        &self,
        principal: &AuthenticatedPrincipal,
        input: NewService,
    ) -> CoreResult<Service> {
        policy::authorize(principal, Action::ManageServices)?;
        let service = self.services.create(Service::create(input, Utc::now()))?;
        tracing::info!(service = %service.id, name = %service.name, actor = %principal.id, "service created");
        Ok(service)
    }

    pub fn update(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &RecordId,
        update: ServiceUpdate,
    ) -> CoreResult<Service> {
        policy::authorize(principal, Action::ManageServices)?;
        let service = self.services.update_atomic(id, &mut |service| {
            service.apply(update.clone());
            Ok(())
        })?;
        tracing::info!(service = %service.id, actor = %principal.id, active = service.active, "service updated");
        Ok(service)
    }

    pub fn delete(&self, principal: &AuthenticatedPrincipal, id: &RecordId) -> CoreResult<()> {
        policy::authorize(principal, Action::ManageServices)?;
        self.services.delete(id)?;
        tracing::info!(service = %id, actor = %principal.id, "service deleted");
        Ok(())
    }
}

impl std::fmt::Debug for DirectoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryService").finish_non_exhaustive()
    }
}

fn sort_by_name(services: &mut [Service]) {
    services.sort_by_cached_key(|s| s.name.as_str().to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::service::tests::sample_service;
    use crate::models::ServiceType;
    use crate::services::fixtures::fixture;
    use referral_types::NonEmptyText;

    fn new_service(name: &str, email: &str) -> NewService {
        let service = sample_service(name, email);
        NewService {
            name: service.name,
            description: service.description,
            head_of_service: service.head_of_service,
            kind: ServiceType::Neurologia,
            active: None,
        }
    }

    #[test]
    fn list_is_sorted_and_search_ignores_case() {
        let fx = fixture();
        let directory = DirectoryService::new(fx.storage.services.clone());
        directory
            .create(&fx.admin, new_service("Neurología", "neuro@hospital.org"))
            .unwrap();

        let names: Vec<String> = directory
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.name.into_inner())
            .collect();
        assert_eq!(names, vec!["Cardiología", "Medicina Interna", "Neurología"]);

        let hits = directory.search("INTERNA").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, fx.internal_medicine);
        assert!(directory.search("dermatología").unwrap().is_empty());
    }

    #[test]
    fn only_admins_change_the_directory() {
        let fx = fixture();
        let directory = DirectoryService::new(fx.storage.services.clone());

        for principal in [&fx.medico, &fx.jefe] {
            assert!(matches!(
                directory.create(principal, new_service("Cirugía", "cx@hospital.org")),
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                directory.update(principal, &fx.cardiology, ServiceUpdate::default()),
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                directory.delete(principal, &fx.cardiology),
                Err(CoreError::Forbidden(_))
            ));
        }

        let updated = directory
            .update(
                &fx.admin,
                &fx.cardiology,
                ServiceUpdate {
                    description: Some(NonEmptyText::new("Heart unit").unwrap()),
                    ..ServiceUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description.as_str(), "Heart unit");

        directory.delete(&fx.admin, &fx.cardiology).unwrap();
        assert!(matches!(
            directory.get(&fx.cardiology),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_service_name_is_a_validation_error() {
        let fx = fixture();
        let directory = DirectoryService::new(fx.storage.services.clone());
        assert!(matches!(
            directory.create(&fx.admin, new_service("medicina interna", "other@hospital.org")),
            Err(CoreError::Validation(_))
        ));
    }
}
