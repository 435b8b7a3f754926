//! Order repository.
//!
//! Every status write is guarded by the status the caller last saw
//! (`WHERE status = $expected`). A guarded write that matches no row means
//! another request moved the order first; callers surface that as a conflict.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use tuntas_kilat_core::{
    Coordinates, OrderId, OrderStatus, PaymentStatus, Price, PromotionId, ServiceId,
    Timeline, TimelineEntry, TrackingId, UserId, WorkerId,
};

use super::RepositoryError;
use super::promotions::consume_usage;
use crate::models::{AvailabilityCount, DashboardStats, Order, StatusCount};

const ORDER_COLUMNS: &str = "id, tracking_id, customer_id, worker_id, service_id, promotion_id, \
     status, address, customer_lat, customer_lng, scheduled_at, notes, subtotal, discount, \
     total, payment_status, timeline, rating, review, created_at, updated_at";

const TRACKING_ID_CONSTRAINT: &str = "orders_tracking_id_key";

/// Fields for a new order row. Status starts at `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tracking_id: TrackingId,
    pub customer_id: UserId,
    pub service_id: ServiceId,
    pub promotion_id: Option<PromotionId>,
    pub address: String,
    pub customer_location: Option<Coordinates>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub subtotal: Price,
    pub discount: Price,
    pub total: Price,
    pub timeline: Timeline,
}

/// Result of [`OrderRepository::create`].
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Box<Order>),
    /// Another order already uses the generated tracking ID.
    TrackingIdTaken,
    /// The promotion hit its usage limit (or was deactivated) meanwhile.
    PromotionExhausted,
}

/// Filters for order listings; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub customer_id: Option<UserId>,
    pub worker_id: Option<WorkerId>,
    pub status: Option<OrderStatus>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order, consuming one use of its promotion in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` for unexpected database errors.
    pub async fn create(&self, new: &NewOrder) -> Result<InsertOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(promotion_id) = new.promotion_id
            && !consume_usage(&mut *tx, promotion_id).await?
        {
            return Ok(InsertOutcome::PromotionExhausted);
        }

        let inserted = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (tracking_id, customer_id, service_id, promotion_id, address, \
                 customer_lat, customer_lng, scheduled_at, notes, subtotal, discount, total, \
                 timeline) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&new.tracking_id)
        .bind(new.customer_id)
        .bind(new.service_id)
        .bind(new.promotion_id)
        .bind(&new.address)
        .bind(new.customer_location.map(|c| c.lat))
        .bind(new.customer_location.map(|c| c.lng))
        .bind(new.scheduled_at)
        .bind(&new.notes)
        .bind(new.subtotal)
        .bind(new.discount)
        .bind(new.total)
        .bind(Json(&new.timeline))
        .fetch_one(&mut *tx)
        .await;

        let order = match inserted {
            Ok(order) => order,
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(TRACKING_ID_CONSTRAINT) =>
            {
                return Ok(InsertOutcome::TrackingIdTaken);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(InsertOutcome::Created(Box::new(order)))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Get an order by its public tracking ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_tracking_id(
        &self,
        tracking_id: &TrackingId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE tracking_id = $1"
        ))
        .bind(tracking_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::int4 IS NULL OR customer_id = $1) \
               AND ($2::int4 IS NULL OR worker_id = $2) \
               AND ($3::order_status IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.customer_id)
        .bind(filter.worker_id)
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Orders the worker is currently working, with customer coordinates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for_worker(
        &self,
        worker_id: WorkerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE worker_id = $1 AND status = ANY($2) AND customer_lat IS NOT NULL \
             ORDER BY scheduled_at"
        ))
        .bind(worker_id)
        .bind(&OrderStatus::ACTIVE_FIELD_STATES[..])
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Move an order from `expected` to `entry.status`, appending `entry` to
    /// the timeline.
    ///
    /// Returns `None` when the order no longer has status `expected`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        entry: &TimelineEntry,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders \
             SET status = $3, timeline = timeline || $4, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(expected)
        .bind(entry.status)
        .bind(Json(std::slice::from_ref(entry)))
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(order) = &order
            && order.status == OrderStatus::Completed
            && let Some(worker_id) = order.worker_id
        {
            refresh_worker_stats(&mut *tx, worker_id).await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    /// Attach a worker to a `confirmed` order and move it to `assigned`.
    ///
    /// Returns `None` when the order is no longer `confirmed`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn assign(
        &self,
        id: OrderId,
        worker_id: WorkerId,
        entry: &TimelineEntry,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders \
             SET worker_id = $2, status = $3, timeline = timeline || $4, updated_at = NOW() \
             WHERE id = $1 AND status = $5 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(worker_id)
        .bind(OrderStatus::Assigned)
        .bind(Json(std::slice::from_ref(entry)))
        .bind(OrderStatus::Confirmed)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// Record the payment outcome reported by the payment provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET payment_status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Store the customer's rating of a completed order and refresh the
    /// worker's aggregates.
    ///
    /// Returns `None` when the order is not completed or already rated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn rate(
        &self,
        id: OrderId,
        rating: i16,
        review: Option<&str>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET rating = $2, review = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4 AND rating IS NULL \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(rating)
        .bind(review)
        .bind(OrderStatus::Completed)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(worker_id) = order.as_ref().and_then(|o| o.worker_id) {
            refresh_worker_stats(&mut *tx, worker_id).await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    /// Aggregates for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let workers_by_availability = sqlx::query_as::<_, AvailabilityCount>(
            "SELECT availability, COUNT(*) AS count FROM workers \
             GROUP BY availability ORDER BY availability",
        )
        .fetch_all(self.pool)
        .await?;

        let (paid_revenue, average_rating): (Price, Option<f64>) = sqlx::query_as(
            "SELECT COALESCE(SUM(total) FILTER (WHERE payment_status = $1), 0), \
                    AVG(rating)::float8 \
             FROM orders",
        )
        .bind(PaymentStatus::Paid)
        .fetch_one(self.pool)
        .await?;

        let total_orders = orders_by_status.iter().map(|c| c.count).sum();

        Ok(DashboardStats {
            orders_by_status,
            workers_by_availability,
            total_orders,
            paid_revenue,
            average_rating,
        })
    }
}

/// Recompute a worker's rating and completed-job aggregates from `orders`.
async fn refresh_worker_stats<'e, E>(executor: E, worker_id: WorkerId) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "UPDATE workers SET \
             rating_average = COALESCE( \
                 (SELECT AVG(rating)::float8 FROM orders \
                  WHERE worker_id = $1 AND rating IS NOT NULL), 0), \
             rating_count = (SELECT COUNT(rating)::int4 FROM orders WHERE worker_id = $1), \
             completed_jobs = (SELECT COUNT(*)::int4 FROM orders \
                               WHERE worker_id = $1 AND status = $2), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(worker_id)
    .bind(OrderStatus::Completed)
    .execute(executor)
    .await?;
    Ok(())
}
