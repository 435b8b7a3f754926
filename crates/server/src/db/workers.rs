//! Worker repository.
//!
//! Availability is only ever written by [`WorkerRepository::set_availability`];
//! order bookkeeping never touches it.

use sqlx::PgPool;

use tuntas_kilat_core::{Coordinates, UserId, UserRole, WorkerAvailability, WorkerId};

use super::RepositoryError;
use crate::models::{Worker, WorkerProfile};

const WORKER_COLUMNS: &str = "w.id, w.user_id, w.availability, w.current_lat, w.current_lng, \
     w.location_updated_at, w.rating_average, w.rating_count, w.completed_jobs, \
     w.created_at, w.updated_at";

/// Repository for worker database operations.
pub struct WorkerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WorkerRepository<'a> {
    /// Create a new worker repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a worker by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: WorkerId) -> Result<Option<Worker>, RepositoryError> {
        let worker = sqlx::query_as::<_, Worker>(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers w WHERE w.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(worker)
    }

    /// Get the worker record linked to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Worker>, RepositoryError> {
        let worker = sqlx::query_as::<_, Worker>(&format!(
            "SELECT {WORKER_COLUMNS} FROM workers w WHERE w.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(worker)
    }

    /// Get a worker together with the linked user's name and phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(
        &self,
        id: WorkerId,
    ) -> Result<Option<WorkerProfile>, RepositoryError> {
        let profile = sqlx::query_as::<_, WorkerProfile>(&format!(
            "SELECT {WORKER_COLUMNS}, u.name, u.phone \
             FROM workers w JOIN users u ON u.id = w.user_id WHERE w.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    /// List worker profiles, best rated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        availability: Option<WorkerAvailability>,
    ) -> Result<Vec<WorkerProfile>, RepositoryError> {
        let profiles = sqlx::query_as::<_, WorkerProfile>(&format!(
            "SELECT {WORKER_COLUMNS}, u.name, u.phone \
             FROM workers w JOIN users u ON u.id = w.user_id \
             WHERE ($1::worker_availability IS NULL OR w.availability = $1) \
             ORDER BY w.rating_average DESC, w.id"
        ))
        .bind(availability)
        .fetch_all(self.pool)
        .await?;
        Ok(profiles)
    }

    /// Make `user_id` a worker: set the user's role and create the worker row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist and
    /// `RepositoryError::Conflict` if the user is already a worker.
    pub async fn promote(&self, user_id: UserId) -> Result<Worker, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 AND role <> 'admin'",
        )
        .bind(user_id)
        .bind(UserRole::Worker)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let worker = sqlx::query_as::<_, Worker>(&format!(
            "INSERT INTO workers AS w (user_id) VALUES ($1) \
             RETURNING {WORKER_COLUMNS}"
        ),
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "worker profile"))?;

        tx.commit().await?;
        Ok(worker)
    }

    /// Set a worker's availability.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the worker does not exist.
    pub async fn set_availability(
        &self,
        id: WorkerId,
        availability: WorkerAvailability,
    ) -> Result<Worker, RepositoryError> {
        sqlx::query_as::<_, Worker>(&format!(
            "UPDATE workers AS w SET availability = $2, updated_at = NOW() WHERE w.id = $1 \
             RETURNING {WORKER_COLUMNS}"
        ),
        )
        .bind(id)
        .bind(availability)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Store the worker's current position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the worker does not exist.
    pub async fn update_location(
        &self,
        id: WorkerId,
        at: Coordinates,
    ) -> Result<Worker, RepositoryError> {
        sqlx::query_as::<_, Worker>(&format!(
            "UPDATE workers AS w \
             SET current_lat = $2, current_lng = $3, location_updated_at = NOW(), \
                 updated_at = NOW() \
             WHERE w.id = $1 \
             RETURNING {WORKER_COLUMNS}"
        ),
        )
        .bind(id)
        .bind(at.lat)
        .bind(at.lng)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
