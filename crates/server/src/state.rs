//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::realtime::EventBroadcaster;
use crate::services::ServiceCatalog;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    events: EventBroadcaster,
    catalog: ServiceCatalog,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let events = EventBroadcaster::new(config.event_capacity);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                events,
                catalog: ServiceCatalog::new(),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the notification broadcaster.
    #[must_use]
    pub fn events(&self) -> &EventBroadcaster {
        &self.inner.events
    }

    /// Get a reference to the cached service catalogue.
    #[must_use]
    pub fn catalog(&self) -> &ServiceCatalog {
        &self.inner.catalog
    }
}
