//! Stateless distance/ETA calculator.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use tuntas_kilat_core::{Coordinates, EtaEstimate};

use crate::error::Result;
use crate::extract::{Json, Query};
use crate::state::AppState;

/// `GET /api/eta` query.
#[derive(Debug, Deserialize)]
pub struct EtaQuery {
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_lat: f64,
    pub to_lng: f64,
}

#[derive(Debug, Serialize)]
pub struct EtaResponse {
    #[serde(flatten)]
    pub estimate: EtaEstimate,
    pub eta_whole_minutes: u32,
    pub average_speed_kmh: f64,
}

/// Distance and travel time between two points at the configured speed.
///
/// GET /api/eta?from_lat=&from_lng=&to_lat=&to_lng=
///
/// # Errors
///
/// Returns 400 for missing or out-of-range coordinates.
pub async fn estimate(
    State(state): State<AppState>,
    Query(query): Query<EtaQuery>,
) -> Result<Json<EtaResponse>> {
    let from = Coordinates::new(query.from_lat, query.from_lng)?;
    let to = Coordinates::new(query.to_lat, query.to_lng)?;
    let speed = state.config().tracking.average_speed_kmh;

    let estimate = EtaEstimate::between_at_speed(from, to, speed)?;
    Ok(Json(EtaResponse {
        eta_whole_minutes: estimate.whole_minutes(),
        estimate,
        average_speed_kmh: speed,
    }))
}
