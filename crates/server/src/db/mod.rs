//! Database operations over `PostgreSQL`.
//!
//! # Tables
//!
//! - `users` - Customers, workers and admins (identity comes from upstream auth)
//! - `workers` - Worker profile, availability and last known location
//! - `services` - Bookable service catalogue
//! - `orders` - Bookings, with the status timeline as JSONB
//! - `promotions` - Discount codes and usage counters
//! - `conversations` / `conversation_messages` - Customer support threads
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tuntas-kilat-cli -- migrate
//! ```

pub mod conversations;
pub mod orders;
pub mod promotions;
pub mod services;
pub mod users;
pub mod workers;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use conversations::ConversationRepository;
pub use orders::{NewOrder, OrderRepository};
pub use promotions::{NewPromotion, PromotionRepository};
pub use services::{NewService, ServiceRepository, ServiceUpdate};
pub use users::{NewUser, UserRepository};
pub use workers::WorkerRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost optimistic update.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to [`RepositoryError::Conflict`].
    pub(crate) fn from_unique(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// Used by tests and tooling that build the router without a live database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
        assert_eq!(
            RepositoryError::Conflict("phone already exists".to_string()).to_string(),
            "conflict: phone already exists"
        );
    }

    #[test]
    fn test_from_unique_passes_through_other_errors() {
        let err = RepositoryError::from_unique(sqlx::Error::RowNotFound, "phone");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
