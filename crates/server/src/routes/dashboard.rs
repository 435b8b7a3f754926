//! Admin dashboard route.

use axum::extract::State;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::Actor;
use crate::models::DashboardStats;
use crate::services::orders::require_admin;
use crate::state::AppState;

/// Order, worker and revenue aggregates.
///
/// GET /api/admin/dashboard
///
/// # Errors
///
/// Returns 403 for non-admins.
pub async fn show(State(state): State<AppState>, Actor(actor): Actor) -> Result<Json<DashboardStats>> {
    require_admin(&actor)?;
    let stats = OrderRepository::new(state.pool()).dashboard_stats().await?;
    tracing::debug!(
        total_orders = stats.total_orders,
        open_orders = stats.open_orders(),
        "Dashboard stats computed"
    );
    Ok(Json(stats))
}
