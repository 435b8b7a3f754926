//! Order routes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use tuntas_kilat_core::{
    Coordinates, OrderId, OrderStatus, PaymentStatus, ServiceId, TrackingId, UserRole, WorkerId,
};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::Actor;
use crate::models::Order;
use crate::routes::Pagination;
use crate::services::{LocationService, OrderEta, OrderService, PlaceOrder};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub service_id: ServiceId,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub promo_code: Option<String>,
}

impl PlaceOrderRequest {
    /// Convert into service input, validating the coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns 400 if only one coordinate is given or either is out of range.
    pub fn into_input(self) -> Result<PlaceOrder> {
        let customer_location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(AppError::BadRequest(
                    "lat and lng must be given together".to_string(),
                ));
            }
        };
        Ok(PlaceOrder {
            service_id: self.service_id,
            address: self.address,
            customer_location,
            scheduled_at: self.scheduled_at,
            notes: self.notes,
            promo_code: self.promo_code,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

impl CancelRequest {
    fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub worker_id: WorkerId,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i16,
    pub review: Option<String>,
}

/// Book a service.
///
/// POST /api/orders
///
/// # Errors
///
/// Returns 400 for invalid input, 403 for non-customers, 404 for unknown
/// services or promotion codes and 422 when the promotion does not apply.
pub async fn place(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    if actor.role != UserRole::Customer {
        return Err(AppError::Forbidden("only customers place orders".to_string()));
    }
    let input = body.into_input()?;
    let order = OrderService::new(&state).place(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders visible to the caller.
///
/// GET /api/orders?status=&limit=&offset=
///
/// # Errors
///
/// Returns 500 on database failure.
pub async fn index(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<OrderQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>> {
    let (limit, offset) = page.bounds();
    let orders = OrderService::new(&state)
        .list(&actor, query.status, limit, offset)
        .await?;
    Ok(Json(orders))
}

/// Order detail.
///
/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 if the order is unknown or not visible to the caller.
pub async fn show(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(OrderService::new(&state).get(&actor, id).await?))
}

/// Order by tracking ID.
///
/// GET /api/orders/track/{tracking_id}
///
/// # Errors
///
/// Returns 400 for a malformed tracking ID and 404 if not visible.
pub async fn track(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(tracking_id): Path<String>,
) -> Result<Json<Order>> {
    let tracking_id = TrackingId::parse(&tracking_id)?;
    Ok(Json(
        OrderService::new(&state)
            .get_by_tracking_id(&actor, &tracking_id)
            .await?,
    ))
}

/// Move an order along its lifecycle.
///
/// POST /api/orders/{id}/status
///
/// # Errors
///
/// Returns 403 when the caller's role may not make this move, 409 for
/// invalid or concurrent transitions.
pub async fn transition(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<TransitionRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(&state)
        .transition(&actor, id, body.status, body.note)
        .await?;
    Ok(Json(order))
}

/// Cancel an order. The body (`{"reason": ...}`) is optional.
///
/// POST /api/orders/{id}/cancel
///
/// # Errors
///
/// Same as [`transition`], plus 400 for a malformed body.
pub async fn cancel(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
    body: Bytes,
) -> Result<Json<Order>> {
    let reason = CancelRequest::from_body(&body)?.reason;
    let order = OrderService::new(&state).cancel(&actor, id, reason).await?;
    Ok(Json(order))
}

/// Assign a worker to a confirmed order.
///
/// POST /api/orders/{id}/assign
///
/// # Errors
///
/// Returns 403 for non-admins, 404 for unknown workers, 409 unless the
/// order is `confirmed`.
pub async fn assign(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(&state)
        .assign(&actor, id, body.worker_id)
        .await?;
    Ok(Json(order))
}

/// Record a payment outcome.
///
/// POST /api/orders/{id}/payment
///
/// # Errors
///
/// Returns 403 for non-admins and 404 for unknown orders.
pub async fn record_payment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(&state)
        .record_payment(&actor, id, body.payment_status)
        .await?;
    Ok(Json(order))
}

/// Rate a completed order.
///
/// POST /api/orders/{id}/rating
///
/// # Errors
///
/// Returns 400 for ratings outside 1..=5 and 409 if the order is not
/// completed or already rated.
pub async fn rate(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
    Json(body): Json<RatingRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(&state)
        .rate(&actor, id, body.rating, body.review)
        .await?;
    Ok(Json(order))
}

/// Live ETA of the assigned worker.
///
/// GET /api/orders/{id}/eta
///
/// # Errors
///
/// Returns 404 when there is no worker or location to estimate from.
pub async fn eta(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderEta>> {
    Ok(Json(LocationService::new(&state).order_eta(&actor, id).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(lat: Option<f64>, lng: Option<f64>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            service_id: ServiceId::new(1),
            address: "Jl. Sudirman 5".to_string(),
            lat,
            lng,
            scheduled_at: Utc::now(),
            notes: None,
            promo_code: None,
        }
    }

    #[test]
    fn test_into_input_coordinates() {
        let input = request(Some(-6.2), Some(106.8)).into_input().unwrap();
        assert!(input.customer_location.is_some());

        let input = request(None, None).into_input().unwrap();
        assert!(input.customer_location.is_none());

        assert!(matches!(
            request(Some(-6.2), None).into_input(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request(Some(-95.0), Some(106.8)).into_input(),
            Err(AppError::Geo(_))
        ));
    }

    #[test]
    fn test_cancel_body_is_optional() {
        assert!(CancelRequest::from_body(b"").unwrap().reason.is_none());
        assert!(CancelRequest::from_body(b"  \n").unwrap().reason.is_none());
        assert_eq!(
            CancelRequest::from_body(br#"{"reason":"Hujan"}"#)
                .unwrap()
                .reason
                .as_deref(),
            Some("Hujan")
        );
        assert!(CancelRequest::from_body(b"{").is_err());
    }

    #[test]
    fn test_transition_request_parses_wire_status() {
        let body: TransitionRequest =
            serde_json::from_str(r#"{"status":"ontheway","note":"otw"}"#).unwrap();
        assert_eq!(body.status, OrderStatus::OnTheWay);
    }
}
