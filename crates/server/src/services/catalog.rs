//! Cached service catalogue.
//!
//! The catalogue is read on every booking screen and changes rarely, so
//! listings are cached in-process with `moka` (5-minute TTL). Admin writes
//! invalidate the whole cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use tuntas_kilat_core::{ServiceCategory, ServiceId};

use crate::db::{NewService, RepositoryError, ServiceRepository, ServiceUpdate};
use crate::models::Service;

/// Cache key: category filter and whether inactive entries are included.
type ListingKey = (Option<ServiceCategory>, bool);

/// Read-through cache over [`ServiceRepository`].
#[derive(Clone)]
pub struct ServiceCatalog {
    listings: Cache<ListingKey, Arc<Vec<Service>>>,
}

impl Default for ServiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceCatalog {
    #[must_use]
    pub fn new() -> Self {
        let listings = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { listings }
    }

    /// List services, serving from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database query fails on a miss.
    pub async fn list(
        &self,
        pool: &PgPool,
        category: Option<ServiceCategory>,
        include_inactive: bool,
    ) -> Result<Arc<Vec<Service>>, RepositoryError> {
        let key = (category, include_inactive);
        if let Some(services) = self.listings.get(&key).await {
            debug!(?category, include_inactive, "Cache hit for services");
            return Ok(services);
        }

        let services = Arc::new(
            ServiceRepository::new(pool)
                .list(category, include_inactive)
                .await?,
        );
        self.listings.insert(key, Arc::clone(&services)).await;
        Ok(services)
    }

    /// Create a catalogue entry and drop cached listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    pub async fn create(&self, pool: &PgPool, new: &NewService) -> Result<Service, RepositoryError> {
        let service = ServiceRepository::new(pool).create(new).await?;
        self.invalidate();
        Ok(service)
    }

    /// Update a catalogue entry and drop cached listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the service does not exist.
    pub async fn update(
        &self,
        pool: &PgPool,
        id: ServiceId,
        update: &ServiceUpdate,
    ) -> Result<Service, RepositoryError> {
        let service = ServiceRepository::new(pool).update(id, update).await?;
        self.invalidate();
        Ok(service)
    }

    /// Drop every cached listing.
    pub fn invalidate(&self) {
        self.listings.invalidate_all();
    }

    /// Insert a listing directly.
    #[cfg(test)]
    pub(crate) async fn prime(&self, key: ListingKey, services: Vec<Service>) {
        self.listings.insert(key, Arc::new(services)).await;
    }
}
