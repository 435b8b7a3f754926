//! Promotion code repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use tuntas_kilat_core::{DiscountRule, Price, PromotionId, ServiceCategory};

use super::RepositoryError;
use crate::models::Promotion;

const PROMOTION_COLUMNS: &str = "id, code, description, rule, categories, min_order_amount, \
     usage_limit, used_count, valid_from, valid_until, active, created_at";

/// Fields for a new promotion code.
#[derive(Debug, Clone)]
pub struct NewPromotion {
    /// Already normalized with [`Promotion::normalize_code`].
    pub code: String,
    pub description: String,
    pub rule: DiscountRule,
    pub categories: Vec<ServiceCategory>,
    pub min_order_amount: Option<Price>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Repository for promotion codes.
pub struct PromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromotionRepository<'a> {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a promotion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already in use.
    pub async fn create(&self, new: &NewPromotion) -> Result<Promotion, RepositoryError> {
        sqlx::query_as::<_, Promotion>(&format!(
            "INSERT INTO promotions (code, description, rule, categories, min_order_amount, \
                 usage_limit, valid_from, valid_until) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(&new.code)
        .bind(&new.description)
        .bind(Json(new.rule))
        .bind(&new.categories)
        .bind(new.min_order_amount)
        .bind(new.usage_limit)
        .bind(new.valid_from)
        .bind(new.valid_until)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "promotion code"))
    }

    /// Look up a promotion by normalized code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Promotion>, RepositoryError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(promotion)
    }

    /// List promotions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Promotion>, RepositoryError> {
        let promotions = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE (NOT $1 OR active) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;
        Ok(promotions)
    }

    /// Switch a promotion off.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the promotion does not exist.
    pub async fn deactivate(&self, id: PromotionId) -> Result<Promotion, RepositoryError> {
        sqlx::query_as::<_, Promotion>(&format!(
            "UPDATE promotions SET active = FALSE WHERE id = $1 RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Take one use of a promotion if it is active and under its limit.
///
/// Returns `false` when no use was available.
pub(crate) async fn consume_usage<'e, E>(
    executor: E,
    id: PromotionId,
) -> Result<bool, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE promotions SET used_count = used_count + 1 \
         WHERE id = $1 AND active AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}
