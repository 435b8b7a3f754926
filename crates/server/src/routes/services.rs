//! Service catalogue routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use tuntas_kilat_core::{Price, ServiceCategory, ServiceId};

use crate::db::{NewService, ServiceRepository, ServiceUpdate};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::{Actor, OptionalActor};
use crate::models::Service;
use crate::services::orders::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ServiceQuery {
    pub category: Option<ServiceCategory>,
    /// Admins only; ignored for everyone else.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ServiceCategory,
    pub price: Price,
    pub duration_minutes: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ServiceCategory>,
    pub price: Option<Price>,
    pub duration_minutes: Option<i32>,
    pub active: Option<bool>,
}

/// List the catalogue.
///
/// GET /api/services
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn index(
    State(state): State<AppState>,
    OptionalActor(actor): OptionalActor,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<Vec<Service>>> {
    let include_inactive = query.include_inactive && actor.as_ref().is_some_and(|u| u.is_admin());
    let services = state
        .catalog()
        .list(state.pool(), query.category, include_inactive)
        .await?;
    Ok(Json(services.as_ref().clone()))
}

/// Get one service.
///
/// GET /api/services/{id}
///
/// # Errors
///
/// Returns 404 if the service does not exist.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ServiceId>,
) -> Result<Json<Service>> {
    ServiceRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))
}

/// Add a catalogue entry.
///
/// POST /api/services
///
/// # Errors
///
/// Returns 403 for non-admins and 400 for invalid fields.
pub async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>)> {
    require_admin(&actor)?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    validate_price_and_duration(Some(body.price), Some(body.duration_minutes))?;

    let new = NewService {
        name: name.to_string(),
        description: body.description.trim().to_string(),
        category: body.category,
        price: body.price,
        duration_minutes: body.duration_minutes,
    };
    let service = state.catalog().create(state.pool(), &new).await?;
    tracing::info!(service_id = %service.id, name = %service.name, "Service created");
    Ok((StatusCode::CREATED, Json(service)))
}

/// Change a catalogue entry.
///
/// PATCH /api/services/{id}
///
/// # Errors
///
/// Returns 403 for non-admins, 400 for invalid fields, 404 if missing.
pub async fn update(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ServiceId>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<Service>> {
    require_admin(&actor)?;
    if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    validate_price_and_duration(body.price, body.duration_minutes)?;

    let update = ServiceUpdate {
        name: body.name.map(|n| n.trim().to_string()),
        description: body.description,
        category: body.category,
        price: body.price,
        duration_minutes: body.duration_minutes,
        active: body.active,
    };
    let service = state.catalog().update(state.pool(), id, &update).await?;
    Ok(Json(service))
}

/// Hide a service from the catalogue. Existing orders keep referencing it.
///
/// DELETE /api/services/{id}
///
/// # Errors
///
/// Returns 403 for non-admins and 404 if missing.
pub async fn deactivate(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ServiceId>,
) -> Result<Json<Service>> {
    require_admin(&actor)?;
    let update = ServiceUpdate {
        active: Some(false),
        ..ServiceUpdate::default()
    };
    let service = state.catalog().update(state.pool(), id, &update).await?;
    tracing::info!(service_id = %id, "Service deactivated");
    Ok(Json(service))
}

fn validate_price_and_duration(price: Option<Price>, duration: Option<i32>) -> Result<()> {
    if price.is_some_and(|p| p.is_negative()) {
        return Err(AppError::BadRequest("price cannot be negative".to_string()));
    }
    if duration.is_some_and(|d| d <= 0) {
        return Err(AppError::BadRequest(
            "duration_minutes must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price_and_duration() {
        assert!(validate_price_and_duration(Some(Price::from_rupiah(50_000)), Some(45)).is_ok());
        assert!(validate_price_and_duration(None, None).is_ok());
        assert!(validate_price_and_duration(Some(Price::from_rupiah(-1)), None).is_err());
        assert!(validate_price_and_duration(None, Some(0)).is_err());
    }

    #[test]
    fn test_service_query_defaults() {
        let query: ServiceQuery = serde_json::from_str(r#"{"category":"car_wash"}"#).unwrap();
        assert_eq!(query.category, Some(ServiceCategory::CarWash));
        assert!(!query.include_inactive);
    }
}
