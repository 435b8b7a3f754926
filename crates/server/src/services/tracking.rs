//! Worker location tracking and ETA notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use tuntas_kilat_core::{
    Coordinates, EtaEstimate, GeoError, OrderId, OrderStatus, TrackingId, UserRole, WorkerId,
};

use super::orders::OrderService;
use crate::config::TrackingConfig;
use crate::db::{OrderRepository, WorkerRepository};
use crate::error::{AppError, Result};
use crate::models::{Order, User, Worker};
use crate::realtime::{Audience, Envelope, EventBroadcaster, Notification};
use crate::state::AppState;

/// Outcome of a location report.
#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    pub worker_id: WorkerId,
    pub lat: f64,
    pub lng: f64,
    pub updated_at: Option<DateTime<Utc>>,
    /// Active orders whose customers were notified.
    pub orders_notified: usize,
}

/// Current ETA for one order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderEta {
    pub order_id: OrderId,
    pub tracking_id: TrackingId,
    pub status: OrderStatus,
    pub worker_id: WorkerId,
    pub worker_location: Coordinates,
    pub location_updated_at: Option<DateTime<Utc>>,
    /// When the worker set out, once the order reached `ontheway`.
    pub on_the_way_since: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub estimate: EtaEstimate,
    /// `eta_minutes` rounded up, for display.
    pub eta_whole_minutes: u32,
}

/// Location operations for one request.
pub struct LocationService<'a> {
    state: &'a AppState,
    pool: &'a PgPool,
    events: &'a EventBroadcaster,
    config: TrackingConfig,
}

impl<'a> LocationService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            pool: state.pool(),
            events: state.events(),
            config: state.config().tracking,
        }
    }

    /// Store the calling worker's position and notify customers of active
    /// orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the caller has no worker record and
    /// `AppError::Geo` for out-of-range coordinates.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn update(&self, actor: &User, lat: f64, lng: f64) -> Result<LocationUpdate> {
        let at = Coordinates::new(lat, lng)?;
        let worker = self.worker_for(actor).await?;

        let worker = WorkerRepository::new(self.pool)
            .update_location(worker.id, at)
            .await?;

        let active = OrderRepository::new(self.pool)
            .active_for_worker(worker.id)
            .await?;

        let mut orders_notified = 0;
        for order in &active {
            let envelopes = location_envelopes(order, worker.id, at, self.config)?;
            if !envelopes.is_empty() {
                orders_notified += 1;
            }
            for envelope in envelopes {
                self.events.publish(envelope);
            }
        }

        tracing::debug!(worker_id = %worker.id, orders_notified, "Worker location updated");

        Ok(LocationUpdate {
            worker_id: worker.id,
            lat: at.lat,
            lng: at.lng,
            updated_at: worker.location_updated_at,
            orders_notified,
        })
    }

    /// Current distance and ETA between the assigned worker and the customer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order is not visible, has no
    /// worker, or either location is unknown.
    pub async fn order_eta(&self, actor: &User, id: OrderId) -> Result<OrderEta> {
        let order = OrderService::new(self.state).get(actor, id).await?;

        let worker_id = order
            .worker_id
            .ok_or_else(|| AppError::NotFound("no worker assigned yet".to_string()))?;
        let destination = order
            .customer_location()
            .ok_or_else(|| AppError::NotFound("order has no customer location".to_string()))?;
        let worker = WorkerRepository::new(self.pool)
            .get_by_id(worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("worker {worker_id}")))?;
        let position = worker
            .location()
            .ok_or_else(|| AppError::NotFound("worker location not reported yet".to_string()))?;

        let estimate =
            EtaEstimate::between_at_speed(position, destination, self.config.average_speed_kmh)?;

        Ok(OrderEta {
            order_id: order.id,
            tracking_id: order.tracking_id,
            status: order.status,
            worker_id,
            worker_location: position,
            location_updated_at: worker.location_updated_at,
            on_the_way_since: order.timeline.entered_at(OrderStatus::OnTheWay),
            eta_whole_minutes: estimate.whole_minutes(),
            estimate,
        })
    }

    async fn worker_for(&self, actor: &User) -> Result<Worker> {
        if actor.role != UserRole::Worker {
            return Err(AppError::Forbidden(
                "only workers report locations".to_string(),
            ));
        }
        WorkerRepository::new(self.pool)
            .get_by_user(actor.id)
            .await?
            .ok_or_else(|| AppError::Forbidden("no worker profile for this user".to_string()))
    }
}

/// Notifications for one active order after the worker moved to `at`.
///
/// Emits `worker_location` for every active order with customer
/// coordinates, plus `worker_nearby` while the worker is on the way and
/// inside the arrival radius.
///
/// # Errors
///
/// Returns [`GeoError::InvalidSpeed`] for a misconfigured speed.
pub fn location_envelopes(
    order: &Order,
    worker_id: WorkerId,
    at: Coordinates,
    config: TrackingConfig,
) -> std::result::Result<Vec<Envelope>, GeoError> {
    let Some(destination) = order.customer_location() else {
        return Ok(Vec::new());
    };
    if !order.status.is_active_field_state() {
        return Ok(Vec::new());
    }

    let estimate = EtaEstimate::between_at_speed(at, destination, config.average_speed_kmh)?;
    let audience = Audience::users_and_admins([order.customer_id]);

    let mut envelopes = vec![
        Envelope::new(
            audience.clone(),
            Notification::worker_location(order, worker_id, at.lat, at.lng, &estimate),
        )
        .for_order(&order.tracking_id),
    ];

    if order.status == OrderStatus::OnTheWay && at.is_within(&destination, config.arrival_radius_km)
    {
        envelopes.push(
            Envelope::new(
                audience,
                Notification::WorkerNearby {
                    order_id: order.id,
                    tracking_id: order.tracking_id.clone(),
                    worker_id,
                    distance_km: estimate.distance_km,
                },
            )
            .for_order(&order.tracking_id),
        );
    }

    Ok(envelopes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::pending_order;

    fn monas() -> Coordinates {
        Coordinates::new(-6.175_392, 106.827_153).unwrap()
    }

    fn order_in(status: OrderStatus) -> Order {
        let mut order = pending_order();
        order.status = status;
        order.worker_id = Some(WorkerId::new(7));
        order
    }

    #[test]
    fn test_far_worker_gets_location_only() {
        let order = order_in(OrderStatus::OnTheWay);
        // Roughly 5 km south of the customer.
        let at = Coordinates::new(-6.220_392, 106.827_153).unwrap();

        let envelopes =
            location_envelopes(&order, WorkerId::new(7), at, TrackingConfig::default()).unwrap();
        assert_eq!(envelopes.len(), 1);
        match &envelopes[0].notification {
            Notification::WorkerLocation {
                distance_km,
                eta_minutes,
                ..
            } => {
                assert!((*distance_km - 5.0).abs() < 0.1);
                // 5 km at 30 km/h is 10 minutes, rounded up.
                assert!((10..=11).contains(eta_minutes));
            }
            other => panic!("unexpected notification {}", other.kind()),
        }
        assert_eq!(envelopes[0].tracking_id.as_ref(), Some(&order.tracking_id));
    }

    #[test]
    fn test_nearby_while_on_the_way() {
        let order = order_in(OrderStatus::OnTheWay);
        let at = Coordinates::new(-6.175_800, 106.827_153).unwrap();

        let envelopes =
            location_envelopes(&order, WorkerId::new(7), at, TrackingConfig::default()).unwrap();
        let kinds: Vec<_> = envelopes.iter().map(|e| e.notification.kind()).collect();
        assert_eq!(kinds, ["worker_location", "worker_nearby"]);
    }

    #[test]
    fn test_no_nearby_once_arrived() {
        let order = order_in(OrderStatus::Arrived);
        let envelopes =
            location_envelopes(&order, WorkerId::new(7), monas(), TrackingConfig::default())
                .unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].notification.kind(), "worker_location");
    }

    #[test]
    fn test_inactive_or_unlocated_orders_are_skipped() {
        let pending = order_in(OrderStatus::Pending);
        assert!(
            location_envelopes(&pending, WorkerId::new(7), monas(), TrackingConfig::default())
                .unwrap()
                .is_empty()
        );

        let mut unlocated = order_in(OrderStatus::OnTheWay);
        unlocated.customer_lat = None;
        unlocated.customer_lng = None;
        assert!(
            location_envelopes(&unlocated, WorkerId::new(7), monas(), TrackingConfig::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_audience_is_customer_and_admins() {
        let order = order_in(OrderStatus::Assigned);
        let envelopes =
            location_envelopes(&order, WorkerId::new(7), monas(), TrackingConfig::default())
                .unwrap();
        assert!(envelopes[0].audience.admins);
        assert_eq!(envelopes[0].audience.users, vec![order.customer_id]);
    }

    #[test]
    fn test_bad_speed_is_rejected() {
        let order = order_in(OrderStatus::OnTheWay);
        let config = TrackingConfig {
            average_speed_kmh: 0.0,
            arrival_radius_km: 0.1,
        };
        assert!(matches!(
            location_envelopes(&order, WorkerId::new(7), monas(), config),
            Err(GeoError::InvalidSpeed(_))
        ));
    }
}
