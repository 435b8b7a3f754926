//! HTTP route handlers.
//!
//! Every `/api` route except the public ones reads the caller from the
//! `x-user-id` header (see [`crate::middleware::Actor`]).
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database)
//! GET  /ws                             - Notification WebSocket (?tracking_id=)
//!
//! # Public
//! GET  /api/eta                        - Distance/ETA calculator
//! GET  /api/services                   - Service catalogue (?category=)
//! GET  /api/services/{id}              - Service detail
//! POST /api/users                      - Register a customer profile
//! POST /api/promotions/validate        - Check a promotion code
//!
//! # Customers, workers, admins
//! GET  /api/users/me                   - Current profile
//! POST /api/orders                     - Place an order (customer)
//! GET  /api/orders                     - Visible orders (?status=&limit=&offset=)
//! GET  /api/orders/{id}                - Order detail
//! GET  /api/orders/track/{tracking_id} - Order by tracking ID
//! POST /api/orders/{id}/status         - Advance the lifecycle
//! POST /api/orders/{id}/cancel         - Cancel with reason
//! POST /api/orders/{id}/rating         - Rate a completed order (customer)
//! GET  /api/orders/{id}/eta            - Live ETA for the assigned worker
//! GET  /api/workers/{id}               - Worker profile
//! PUT  /api/workers/me/availability    - Set own availability (worker)
//! POST /api/workers/me/location        - Report own location (worker)
//! GET  /api/conversations              - Own conversations (all for admins)
//! POST /api/conversations              - Open a conversation (customer)
//! GET  /api/conversations/{id}/messages - Message history
//! POST /api/conversations/{id}/messages - Post a message
//!
//! # Admin
//! GET   /api/users                     - List users (?role=)
//! PATCH /api/users/{id}/tier           - Change membership tier
//! POST  /api/workers                   - Promote a user to worker
//! GET   /api/workers                   - List workers (?availability=)
//! POST  /api/orders/{id}/assign        - Assign a worker
//! POST  /api/orders/{id}/payment       - Record payment status
//! POST  /api/services                  - Create a service
//! PATCH /api/services/{id}             - Update a service
//! DELETE /api/services/{id}            - Deactivate a service
//! GET   /api/promotions                - List promotions
//! POST  /api/promotions                - Create a promotion
//! POST  /api/promotions/{id}/deactivate - Deactivate a promotion
//! GET   /api/admin/dashboard           - Dashboard aggregates
//! ```

pub mod conversations;
pub mod dashboard;
pub mod eta;
pub mod health;
pub mod orders;
pub mod promotions;
pub mod services;
pub mod users;
pub mod workers;
pub mod ws;

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use serde::Deserialize;

use crate::state::AppState;

/// Default and maximum page sizes for listings.
const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamped `(limit, offset)`.
    #[must_use]
    pub fn bounds(self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Create the service catalogue routes router.
pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(services::index).post(services::create))
        .route(
            "/{id}",
            get(services::show)
                .patch(services::update)
                .delete(services::deactivate),
        )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::register))
        .route("/me", get(users::me))
        .route("/{id}/tier", patch(users::update_tier))
}

/// Create the worker routes router.
pub fn worker_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(workers::index).post(workers::promote))
        .route("/me/availability", put(workers::set_availability))
        .route("/me/location", post(workers::update_location))
        .route("/{id}", get(workers::show))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/track/{tracking_id}", get(orders::track))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::transition))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/assign", post(orders::assign))
        .route("/{id}/payment", post(orders::record_payment))
        .route("/{id}/rating", post(orders::rate))
        .route("/{id}/eta", get(orders::eta))
}

/// Create the promotion routes router.
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(promotions::index).post(promotions::create))
        .route("/validate", post(promotions::validate))
        .route("/{id}/deactivate", post(promotions::deactivate))
}

/// Create the conversation routes router.
pub fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(conversations::index).post(conversations::open))
        .route(
            "/{id}/messages",
            get(conversations::messages).post(conversations::post_message),
        )
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/ws", get(ws::connect))
        .route("/api/eta", get(eta::estimate))
        .route("/api/admin/dashboard", get(dashboard::show))
        .nest("/api/services", service_routes())
        .nest("/api/users", user_routes())
        .nest("/api/workers", worker_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/promotions", promotion_routes())
        .nest("/api/conversations", conversation_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::default().bounds(), (50, 0));
        let p = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(p.bounds(), (200, 0));
        let p = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(p.bounds(), (1, 20));
    }
}
