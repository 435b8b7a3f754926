//! Worker routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use tuntas_kilat_core::{UserId, UserRole, WorkerAvailability, WorkerId};

use crate::db::WorkerRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::Actor;
use crate::models::{Worker, WorkerProfile};
use crate::services::orders::require_admin;
use crate::services::{LocationService, LocationUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct WorkerQuery {
    pub availability: Option<WorkerAvailability>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub availability: WorkerAvailability,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
}

/// Give a user the worker role.
///
/// POST /api/workers
///
/// # Errors
///
/// Returns 403 for non-admins, 404 for unknown (or admin) users and 409 if
/// the user is already a worker.
pub async fn promote(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<Worker>)> {
    require_admin(&actor)?;
    let worker = WorkerRepository::new(state.pool())
        .promote(body.user_id)
        .await?;
    tracing::info!(user_id = %body.user_id, worker_id = %worker.id, "User promoted to worker");
    Ok((StatusCode::CREATED, Json(worker)))
}

/// List workers.
///
/// GET /api/workers?availability=
///
/// # Errors
///
/// Returns 403 for non-admins.
pub async fn index(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<WorkerQuery>,
) -> Result<Json<Vec<WorkerProfile>>> {
    require_admin(&actor)?;
    let workers = WorkerRepository::new(state.pool())
        .list(query.availability)
        .await?;
    Ok(Json(workers))
}

/// Worker profile.
///
/// GET /api/workers/{id}
///
/// # Errors
///
/// Returns 404 for unknown workers.
pub async fn show(
    State(state): State<AppState>,
    Actor(_actor): Actor,
    Path(id): Path<WorkerId>,
) -> Result<Json<WorkerProfile>> {
    WorkerRepository::new(state.pool())
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("worker {id}")))
}

/// Set the caller's own availability.
///
/// PUT /api/workers/me/availability
///
/// # Errors
///
/// Returns 403 if the caller is not a worker.
pub async fn set_availability(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<Worker>> {
    if actor.role != UserRole::Worker {
        return Err(AppError::Forbidden(
            "only workers set availability".to_string(),
        ));
    }
    let repo = WorkerRepository::new(state.pool());
    let worker = repo
        .get_by_user(actor.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("no worker profile for this user".to_string()))?;
    let worker = repo.set_availability(worker.id, body.availability).await?;
    tracing::info!(worker_id = %worker.id, availability = %worker.availability, "Availability changed");
    Ok(Json(worker))
}

/// Report the caller's position; notifies customers of active orders.
///
/// POST /api/workers/me/location
///
/// # Errors
///
/// Returns 400 for out-of-range coordinates and 403 for non-workers.
pub async fn update_location(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<LocationRequest>,
) -> Result<Json<LocationUpdate>> {
    let update = LocationService::new(&state)
        .update(&actor, body.lat, body.lng)
        .await?;
    Ok(Json(update))
}
