//! Service catalogue repository.

use sqlx::PgPool;

use tuntas_kilat_core::{Price, ServiceCategory, ServiceId};

use super::RepositoryError;
use crate::models::Service;

const SERVICE_COLUMNS: &str =
    "id, name, description, category, price, duration_minutes, active, created_at, updated_at";

/// Fields for a new catalogue entry.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: Price,
    pub duration_minutes: i32,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ServiceCategory>,
    pub price: Option<Price>,
    pub duration_minutes: Option<i32>,
    pub active: Option<bool>,
}

/// Repository for the service catalogue.
pub struct ServiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceRepository<'a> {
    /// Create a new service repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List services ordered by category and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        category: Option<ServiceCategory>,
        include_inactive: bool,
    ) -> Result<Vec<Service>, RepositoryError> {
        let services = sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE ($1::service_category IS NULL OR category = $1) AND ($2 OR active) \
             ORDER BY category, price, id"
        ))
        .bind(category)
        .bind(include_inactive)
        .fetch_all(self.pool)
        .await?;
        Ok(services)
    }

    /// Get a service by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let service = sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(service)
    }

    /// Insert a catalogue entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewService) -> Result<Service, RepositoryError> {
        let service = sqlx::query_as::<_, Service>(&format!(
            "INSERT INTO services (name, description, category, price, duration_minutes) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category)
        .bind(new.price)
        .bind(new.duration_minutes)
        .fetch_one(self.pool)
        .await?;
        Ok(service)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the service does not exist.
    pub async fn update(
        &self,
        id: ServiceId,
        update: &ServiceUpdate,
    ) -> Result<Service, RepositoryError> {
        sqlx::query_as::<_, Service>(&format!(
            "UPDATE services SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 category = COALESCE($4, category), \
                 price = COALESCE($5, price), \
                 duration_minutes = COALESCE($6, duration_minutes), \
                 active = COALESCE($7, active), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.category)
        .bind(update.price)
        .bind(update.duration_minutes)
        .bind(update.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Insert or refresh a catalogue entry keyed by name, used by seeding.
    ///
    /// Returns `true` when a new row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_by_name(&self, new: &NewService) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE services SET description = $2, category = $3, price = $4, \
                 duration_minutes = $5, active = TRUE, updated_at = NOW() \
             WHERE name = $1",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.category)
        .bind(new.price)
        .bind(new.duration_minutes)
        .execute(self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(false);
        }
        self.create(new).await?;
        Ok(true)
    }
}
