//! Order lifecycle service.
//!
//! Wraps the pure state machine from `tuntas_kilat_core` with ownership
//! checks, guarded persistence and notification dispatch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use tuntas_kilat_core::{
    Coordinates, OrderId, OrderStatus, PaymentStatus, Price, PromotionError, ServiceId, Timeline,
    TrackingId, TransitionPolicy, UserId, UserRole, WorkerId,
};

use crate::db::orders::{InsertOutcome, OrderFilter};
use crate::db::{NewOrder, OrderRepository, PromotionRepository, ServiceRepository, WorkerRepository};
use crate::error::{AppError, Result};
use crate::models::{Order, Promotion, Service, User};
use crate::realtime::{Audience, Envelope, EventBroadcaster, Notification};
use crate::state::AppState;

/// Attempts at generating an unused tracking ID before giving up.
const MAX_TRACKING_ID_ATTEMPTS: usize = 5;

/// Customer input for a new booking.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub service_id: ServiceId,
    pub address: String,
    pub customer_location: Option<Coordinates>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub promo_code: Option<String>,
}

/// Price breakdown for a service and optional promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
}

impl Quote {
    /// Price `service`, applying `promotion` if given.
    ///
    /// # Errors
    ///
    /// Returns the [`PromotionError`] that disqualifies the promotion.
    pub fn compute(
        service: &Service,
        promotion: Option<&Promotion>,
        now: DateTime<Utc>,
    ) -> std::result::Result<Self, PromotionError> {
        let subtotal = service.price;
        let discount = match promotion {
            Some(p) => p.terms().evaluate(subtotal, service.category, now)?,
            None => Price::ZERO,
        };
        Ok(Self {
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        })
    }
}

/// Order operations for one request.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    events: &'a EventBroadcaster,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            pool: state.pool(),
            events: state.events(),
        }
    }

    /// Book a service for `customer`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty address or unavailable
    /// service, `AppError::Promotion` when the code does not apply, and
    /// database errors.
    #[instrument(skip(self, customer, input), fields(customer_id = %customer.id, service_id = %input.service_id))]
    pub async fn place(&self, customer: &User, input: PlaceOrder) -> Result<Order> {
        let address = input.address.trim();
        if address.is_empty() {
            return Err(AppError::BadRequest("address is required".to_string()));
        }

        let service = ServiceRepository::new(self.pool)
            .get_by_id(input.service_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("service {}", input.service_id)))?;
        if !service.active {
            return Err(AppError::BadRequest(format!(
                "service {} is not available",
                service.name
            )));
        }

        let promotion = match input.promo_code.as_deref().map(Promotion::normalize_code) {
            Some(code) if !code.is_empty() => Some(
                PromotionRepository::new(self.pool)
                    .get_by_code(&code)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("promotion code {code}")))?,
            ),
            _ => None,
        };

        let now = Utc::now();
        let quote = Quote::compute(&service, promotion.as_ref(), now)?;
        let timeline = Timeline::started(now, Some(customer.id));

        let repo = OrderRepository::new(self.pool);
        let mut placed = None;
        for attempt in 1..=MAX_TRACKING_ID_ATTEMPTS {
            let new = NewOrder {
                tracking_id: TrackingId::generate(now, &mut rand::rng()),
                customer_id: customer.id,
                service_id: service.id,
                promotion_id: promotion.as_ref().map(|p| p.id),
                address: address.to_string(),
                customer_location: input.customer_location,
                scheduled_at: input.scheduled_at,
                notes: input.notes.clone().filter(|n| !n.trim().is_empty()),
                subtotal: quote.subtotal,
                discount: quote.discount,
                total: quote.total,
                timeline: timeline.clone(),
            };

            match repo.create(&new).await? {
                InsertOutcome::Created(order) => {
                    placed = Some(*order);
                    break;
                }
                InsertOutcome::TrackingIdTaken => {
                    tracing::warn!(attempt, tracking_id = %new.tracking_id, "Tracking ID collision");
                }
                InsertOutcome::PromotionExhausted => {
                    return Err(PromotionError::UsageLimitReached.into());
                }
            }
        }

        let order = placed.ok_or_else(|| {
            AppError::Internal("could not allocate a unique tracking id".to_string())
        })?;

        tracing::info!(order_id = %order.id, tracking_id = %order.tracking_id, total = %order.total, "Order placed");
        self.events.publish(
            Envelope::new(Audience::admins(), Notification::order_created(&order))
                .for_order(&order.tracking_id),
        );

        Ok(order)
    }

    /// Fetch an order the actor may see.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist or is not
    /// visible to the actor.
    pub async fn get(&self, actor: &User, id: OrderId) -> Result<Order> {
        let order = self.load(id).await?;
        let worker_id = self.worker_id_of(actor).await?;
        if can_view(actor, worker_id, &order) {
            Ok(order)
        } else {
            Err(AppError::NotFound(format!("order {id}")))
        }
    }

    /// Fetch an order by tracking ID, subject to the same visibility as [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no visible order has this tracking ID.
    pub async fn get_by_tracking_id(&self, actor: &User, tracking_id: &TrackingId) -> Result<Order> {
        let order = OrderRepository::new(self.pool)
            .get_by_tracking_id(tracking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {tracking_id}")))?;
        let worker_id = self.worker_id_of(actor).await?;
        if can_view(actor, worker_id, &order) {
            Ok(order)
        } else {
            Err(AppError::NotFound(format!("order {tracking_id}")))
        }
    }

    /// Orders visible to the actor: their own as customer, assigned ones as
    /// worker, everything as admin.
    ///
    /// # Errors
    ///
    /// Returns database errors.
    pub async fn list(
        &self,
        actor: &User,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        let filter = match actor.role {
            UserRole::Admin => OrderFilter {
                status,
                ..OrderFilter::default()
            },
            UserRole::Worker => match self.worker_id_of(actor).await? {
                Some(worker_id) => OrderFilter {
                    worker_id: Some(worker_id),
                    status,
                    ..OrderFilter::default()
                },
                None => return Ok(Vec::new()),
            },
            UserRole::Customer => OrderFilter {
                customer_id: Some(actor.id),
                status,
                ..OrderFilter::default()
            },
        };
        Ok(OrderRepository::new(self.pool)
            .list(filter, limit, offset)
            .await?)
    }

    /// Move an order to `to` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transition` for lifecycle or role violations,
    /// `AppError::Conflict` if the order changed concurrently, and
    /// `AppError::NotFound` if the actor cannot see the order.
    #[instrument(skip(self, actor, note), fields(actor_id = %actor.id, role = %actor.role))]
    pub async fn transition(
        &self,
        actor: &User,
        id: OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        let order = self.load(id).await?;
        let worker_id = self.worker_id_of(actor).await?;
        if !can_view(actor, worker_id, &order) {
            return Err(AppError::NotFound(format!("order {id}")));
        }

        TransitionPolicy.check(actor.role, order.status, to)?;
        if to == OrderStatus::Assigned {
            return Err(AppError::BadRequest(
                "assign a worker to move an order to assigned".to_string(),
            ));
        }

        let entry = order.next_entry(
            to,
            Utc::now(),
            Some(actor.id),
            note.filter(|n| !n.trim().is_empty()),
        )?;
        let updated = OrderRepository::new(self.pool)
            .update_status(id, order.status, &entry)
            .await?
            .ok_or_else(concurrent_change)?;

        tracing::info!(
            order_id = %id,
            from = %order.status,
            to = %updated.status,
            "Order status changed"
        );

        let audience = self.order_audience(&updated).await?;
        self.events.publish(
            Envelope::new(
                audience,
                Notification::OrderStatusChanged {
                    order_id: updated.id,
                    tracking_id: updated.tracking_id.clone(),
                    from: order.status,
                    to: updated.status,
                    note: entry.note,
                    at: entry.timestamp,
                },
            )
            .for_order(&updated.tracking_id),
        );

        Ok(updated)
    }

    /// Cancel an order with an optional reason.
    ///
    /// # Errors
    ///
    /// Same as [`transition`](Self::transition).
    pub async fn cancel(&self, actor: &User, id: OrderId, reason: Option<String>) -> Result<Order> {
        self.transition(actor, id, OrderStatus::Cancelled, reason)
            .await
    }

    /// Attach a worker to a confirmed order.
    ///
    /// Worker availability is left untouched; admins assign whoever they
    /// choose.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins, `AppError::Transition`
    /// if the order is not `confirmed`, and `AppError::NotFound` for unknown
    /// orders or workers.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn assign(&self, admin: &User, id: OrderId, worker_id: WorkerId) -> Result<Order> {
        require_admin(admin)?;

        let order = self.load(id).await?;
        TransitionPolicy.check(admin.role, order.status, OrderStatus::Assigned)?;

        let worker = WorkerRepository::new(self.pool)
            .get_profile(worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("worker {worker_id}")))?;

        let entry = order.next_entry(
            OrderStatus::Assigned,
            Utc::now(),
            Some(admin.id),
            Some(format!("assigned to {}", worker.name)),
        )?;
        let updated = OrderRepository::new(self.pool)
            .assign(id, worker_id, &entry)
            .await?
            .ok_or_else(concurrent_change)?;

        tracing::info!(order_id = %id, worker_id = %worker_id, "Worker assigned");

        self.events.publish(
            Envelope::new(
                Audience::users_and_admins([updated.customer_id, worker.worker.user_id]),
                Notification::OrderAssigned {
                    order_id: updated.id,
                    tracking_id: updated.tracking_id.clone(),
                    worker_id,
                    worker_name: worker.name,
                },
            )
            .for_order(&updated.tracking_id),
        );

        Ok(updated)
    }

    /// Record the payment status reported by the external payment provider.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins and `AppError::Database`
    /// (not found) for unknown orders.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn record_payment(
        &self,
        admin: &User,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order> {
        require_admin(admin)?;
        let order = OrderRepository::new(self.pool)
            .set_payment_status(id, status)
            .await?;
        tracing::info!(order_id = %id, payment_status = %status, "Payment recorded");
        Ok(order)
    }

    /// Rate a completed order, once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for ratings outside 1..=5,
    /// `AppError::Conflict` if the order is not completed or already rated.
    #[instrument(skip(self, customer, review), fields(customer_id = %customer.id))]
    pub async fn rate(
        &self,
        customer: &User,
        id: OrderId,
        rating: i16,
        review: Option<String>,
    ) -> Result<Order> {
        validate_rating(rating)?;

        let order = self.load(id).await?;
        if !order.is_owned_by(customer.id) {
            return Err(AppError::NotFound(format!("order {id}")));
        }
        if order.status != OrderStatus::Completed {
            return Err(AppError::Conflict(
                "only completed orders can be rated".to_string(),
            ));
        }
        if order.rating.is_some() {
            return Err(AppError::Conflict("order was already rated".to_string()));
        }

        let review = review.filter(|r| !r.trim().is_empty());
        OrderRepository::new(self.pool)
            .rate(id, rating, review.as_deref())
            .await?
            .ok_or_else(|| AppError::Conflict("order was already rated".to_string()))
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        OrderRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    async fn worker_id_of(&self, actor: &User) -> Result<Option<WorkerId>> {
        if actor.role != UserRole::Worker {
            return Ok(None);
        }
        Ok(WorkerRepository::new(self.pool)
            .get_by_user(actor.id)
            .await?
            .map(|w| w.id))
    }

    /// Customer, assigned worker (if any) and admins.
    async fn order_audience(&self, order: &Order) -> Result<Audience> {
        let mut users: Vec<UserId> = vec![order.customer_id];
        if let Some(worker_id) = order.worker_id
            && let Some(worker) = WorkerRepository::new(self.pool).get_by_id(worker_id).await?
        {
            users.push(worker.user_id);
        }
        Ok(Audience::users_and_admins(users))
    }
}

/// Whether `actor` may see `order`. `worker_id` is the actor's worker record.
pub(crate) fn can_view(actor: &User, worker_id: Option<WorkerId>, order: &Order) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::Customer => order.is_owned_by(actor.id),
        UserRole::Worker => worker_id.is_some_and(|w| order.is_assigned_to(w)),
    }
}

pub(crate) fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("admin access required".to_string()))
    }
}

fn validate_rating(rating: i16) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ))
    }
}

fn concurrent_change() -> AppError {
    AppError::Conflict("order was modified by another request, reload and retry".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;
    use tuntas_kilat_core::{
        DiscountRule, MembershipTier, PhoneNumber, PromotionId, ServiceCategory,
    };

    use super::*;
    use crate::models::order::fixtures::pending_order;

    fn user(id: i32, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            name: format!("user {id}"),
            phone: PhoneNumber::parse("081234567890").unwrap(),
            email: None,
            role,
            membership_tier: MembershipTier::Regular,
            created_at: now,
            updated_at: now,
        }
    }

    fn lawn_mowing(price: i64) -> Service {
        let now = Utc::now();
        Service {
            id: ServiceId::new(4),
            name: "Potong Rumput".to_string(),
            description: String::new(),
            category: ServiceCategory::LawnMowing,
            price: Price::from_rupiah(price),
            duration_minutes: 90,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn promotion(rule: DiscountRule) -> Promotion {
        Promotion {
            id: PromotionId::new(1),
            code: "HEMAT".to_string(),
            description: String::new(),
            rule,
            categories: Vec::new(),
            min_order_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_quote_without_promotion() {
        let quote = Quote::compute(&lawn_mowing(120_000), None, Utc::now()).unwrap();
        assert_eq!(quote.subtotal, Price::from_rupiah(120_000));
        assert_eq!(quote.discount, Price::ZERO);
        assert_eq!(quote.total, Price::from_rupiah(120_000));
    }

    #[test]
    fn test_quote_with_capped_percentage() {
        let promo = promotion(DiscountRule::Percentage {
            percent: Decimal::from(20),
            max_discount: Some(Price::from_rupiah(15_000)),
        });
        let quote = Quote::compute(&lawn_mowing(120_000), Some(&promo), Utc::now()).unwrap();
        assert_eq!(quote.discount, Price::from_rupiah(15_000));
        assert_eq!(quote.total, Price::from_rupiah(105_000));
    }

    #[test]
    fn test_quote_total_never_negative() {
        let promo = promotion(DiscountRule::FixedAmount {
            amount: Price::from_rupiah(500_000),
        });
        let quote = Quote::compute(&lawn_mowing(120_000), Some(&promo), Utc::now()).unwrap();
        assert_eq!(quote.total, Price::ZERO);
    }

    #[test]
    fn test_quote_rejects_expired_promotion() {
        let mut promo = promotion(DiscountRule::FixedAmount {
            amount: Price::from_rupiah(10_000),
        });
        promo.valid_until = Some(Utc::now() - Duration::hours(1));
        assert_eq!(
            Quote::compute(&lawn_mowing(120_000), Some(&promo), Utc::now()),
            Err(PromotionError::Expired)
        );
    }

    #[test]
    fn test_can_view() {
        let mut order = pending_order();
        let owner = user(1, UserRole::Customer);
        let stranger = user(2, UserRole::Customer);
        let admin = user(3, UserRole::Admin);
        let worker = user(4, UserRole::Worker);

        assert!(can_view(&owner, None, &order));
        assert!(!can_view(&stranger, None, &order));
        assert!(can_view(&admin, None, &order));
        assert!(!can_view(&worker, Some(WorkerId::new(7)), &order));

        order.worker_id = Some(WorkerId::new(7));
        assert!(can_view(&worker, Some(WorkerId::new(7)), &order));
        assert!(!can_view(&worker, Some(WorkerId::new(8)), &order));
        assert!(!can_view(&worker, None, &order));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(1, UserRole::Admin)).is_ok());
        assert!(matches!(
            require_admin(&user(1, UserRole::Worker)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
