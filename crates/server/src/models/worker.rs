//! Field worker model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{Coordinates, PhoneNumber, UserId, WorkerAvailability, WorkerId};

/// Worker record linked one-to-one with a [`User`](super::User).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Worker {
    pub id: WorkerId,
    pub user_id: UserId,
    pub availability: WorkerAvailability,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub rating_average: f64,
    pub rating_count: i32,
    pub completed_jobs: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    /// Last reported position, if any.
    #[must_use]
    pub const fn location(&self) -> Option<Coordinates> {
        Coordinates::from_columns(self.current_lat, self.current_lng)
    }
}

/// A worker together with the user fields shown to customers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkerProfile {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub worker: Worker,
    pub name: String,
    pub phone: PhoneNumber,
}
