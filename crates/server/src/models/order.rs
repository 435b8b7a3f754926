//! Order model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{
    Coordinates, OrderId, OrderStatus, PaymentStatus, Price, PromotionId, ServiceId, Timeline,
    TimelineEntry, TrackingId, TransitionError, UserId, WorkerId,
};

/// A booked service visit.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub tracking_id: TrackingId,
    pub customer_id: UserId,
    pub worker_id: Option<WorkerId>,
    pub service_id: ServiceId,
    pub promotion_id: Option<PromotionId>,
    pub status: OrderStatus,
    pub address: String,
    pub customer_lat: Option<f64>,
    pub customer_lng: Option<f64>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
    pub payment_status: PaymentStatus,
    #[sqlx(json)]
    pub timeline: Timeline,
    pub rating: Option<i16>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Where the service takes place, if the customer shared coordinates.
    #[must_use]
    pub const fn customer_location(&self) -> Option<Coordinates> {
        Coordinates::from_columns(self.customer_lat, self.customer_lng)
    }

    /// Whether `user` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.customer_id == user
    }

    /// Whether `worker` is assigned to this order.
    #[must_use]
    pub fn is_assigned_to(&self, worker: WorkerId) -> bool {
        self.worker_id == Some(worker)
    }

    /// The timeline entry that moves this order to `to`.
    ///
    /// The move is checked against the latest recorded entry; the stored
    /// timeline is left as is and the caller persists the returned entry.
    ///
    /// # Errors
    ///
    /// Returns the lifecycle error if `to` does not follow the latest entry.
    pub fn next_entry(
        &self,
        to: OrderStatus,
        at: DateTime<Utc>,
        actor: Option<UserId>,
        note: Option<String>,
    ) -> Result<TimelineEntry, TransitionError> {
        self.timeline.clone().advance(to, at, actor, note)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A pending order with customer coordinates in central Jakarta.
    pub fn pending_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(10),
            tracking_id: TrackingId::parse("TK-20260301-AB12CD").expect("tracking id"),
            customer_id: UserId::new(1),
            worker_id: None,
            service_id: ServiceId::new(2),
            promotion_id: None,
            status: OrderStatus::Pending,
            address: "Jl. Merdeka 1, Jakarta".to_string(),
            customer_lat: Some(-6.175_392),
            customer_lng: Some(106.827_153),
            scheduled_at: now,
            notes: None,
            subtotal: Price::from_rupiah(75_000),
            discount: Price::ZERO,
            total: Price::from_rupiah(75_000),
            payment_status: PaymentStatus::Pending,
            timeline: Timeline::started(now, Some(UserId::new(1))),
            rating: None,
            review: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_serialization() {
        let order = fixtures::pending_order();
        let json = serde_json::to_value(&order).expect("serialize");

        assert_eq!(json["tracking_id"], "TK-20260301-AB12CD");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total"], "75000");
        assert_eq!(json["timeline"][0]["status"], "pending");
    }

    #[test]
    fn test_ownership_helpers() {
        let mut order = fixtures::pending_order();
        assert!(order.is_owned_by(UserId::new(1)));
        assert!(!order.is_owned_by(UserId::new(2)));
        assert!(!order.is_assigned_to(WorkerId::new(3)));

        order.worker_id = Some(WorkerId::new(3));
        assert!(order.is_assigned_to(WorkerId::new(3)));
        assert!(order.customer_location().is_some());
    }

    #[test]
    fn test_next_entry_follows_latest_timeline_entry() {
        let order = fixtures::pending_order();
        let at = Utc::now();

        let entry = order
            .next_entry(OrderStatus::Confirmed, at, Some(UserId::new(5)), None)
            .expect("pending -> confirmed");
        assert_eq!(entry.status, OrderStatus::Confirmed);
        assert_eq!(entry.timestamp, at);
        assert_eq!(entry.actor, Some(UserId::new(5)));
        assert_eq!(order.timeline.len(), 1);

        assert!(matches!(
            order.next_entry(OrderStatus::Completed, at, None, None),
            Err(TransitionError::Skipped { .. })
        ));
    }

    #[test]
    fn test_next_entry_rejects_status_ahead_of_timeline() {
        // Status column moved on without a matching timeline entry.
        let mut order = fixtures::pending_order();
        order.status = OrderStatus::Confirmed;
        assert!(
            order
                .next_entry(OrderStatus::Assigned, Utc::now(), None, None)
                .is_err()
        );
    }
}
