//! Bookable service model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{Price, ServiceCategory, ServiceId};

/// An entry in the service catalogue (e.g. "Cuci Mobil Premium").
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: Price,
    pub duration_minutes: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
