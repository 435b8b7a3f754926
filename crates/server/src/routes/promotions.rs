//! Promotion code routes.

use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tuntas_kilat_core::{DiscountRule, Price, PromotionId, ServiceCategory, ServiceId};

use crate::db::{NewPromotion, PromotionRepository, ServiceRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::Actor;
use crate::models::Promotion;
use crate::services::Quote;
use crate::services::orders::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePromotionRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub rule: DiscountRule,
    #[serde(default)]
    pub categories: Vec<ServiceCategory>,
    pub min_order_amount: Option<Price>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl CreatePromotionRequest {
    /// Validate and normalize into repository input.
    ///
    /// # Errors
    ///
    /// Returns 400 for an empty code, bad usage limit or inverted validity
    /// window, and 422 for an invalid discount rule.
    pub fn into_new(self) -> Result<NewPromotion> {
        let code = Promotion::normalize_code(&self.code);
        if code.is_empty() {
            return Err(AppError::BadRequest("code is required".to_string()));
        }
        if code.chars().any(char::is_whitespace) {
            return Err(AppError::BadRequest(
                "code cannot contain whitespace".to_string(),
            ));
        }
        self.rule.validate()?;
        if self.usage_limit.is_some_and(|l| l <= 0) {
            return Err(AppError::BadRequest(
                "usage_limit must be positive".to_string(),
            ));
        }
        if self.min_order_amount.is_some_and(|m| m.is_negative()) {
            return Err(AppError::BadRequest(
                "min_order_amount cannot be negative".to_string(),
            ));
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until)
            && until <= from
        {
            return Err(AppError::BadRequest(
                "valid_until must be after valid_from".to_string(),
            ));
        }

        Ok(NewPromotion {
            code,
            description: self.description.trim().to_string(),
            rule: self.rule,
            categories: self.categories,
            min_order_amount: self.min_order_amount,
            usage_limit: self.usage_limit,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PromotionQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub service_id: ServiceId,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub code: String,
    pub service_id: ServiceId,
    #[serde(flatten)]
    pub quote: Quote,
}

/// Create a promotion code.
///
/// POST /api/promotions
///
/// # Errors
///
/// Returns 403 for non-admins, 400/422 for invalid input and 409 if the code
/// already exists.
pub async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<CreatePromotionRequest>,
) -> Result<(StatusCode, Json<Promotion>)> {
    require_admin(&actor)?;
    let new = body.into_new()?;
    let promotion = PromotionRepository::new(state.pool()).create(&new).await?;
    tracing::info!(promotion_id = %promotion.id, code = %promotion.code, "Promotion created");
    Ok((StatusCode::CREATED, Json(promotion)))
}

/// List promotion codes.
///
/// GET /api/promotions?active_only=
///
/// # Errors
///
/// Returns 403 for non-admins.
pub async fn index(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<PromotionQuery>,
) -> Result<Json<Vec<Promotion>>> {
    require_admin(&actor)?;
    let promotions = PromotionRepository::new(state.pool())
        .list(query.active_only)
        .await?;
    Ok(Json(promotions))
}

/// Stop a promotion from being applied.
///
/// POST /api/promotions/{id}/deactivate
///
/// # Errors
///
/// Returns 403 for non-admins and 404 if missing.
pub async fn deactivate(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<PromotionId>,
) -> Result<Json<Promotion>> {
    require_admin(&actor)?;
    let promotion = PromotionRepository::new(state.pool()).deactivate(id).await?;
    tracing::info!(promotion_id = %id, "Promotion deactivated");
    Ok(Json(promotion))
}

/// Preview the discount a code gives on a service. Does not consume usage.
///
/// POST /api/promotions/validate
///
/// # Errors
///
/// Returns 404 for unknown codes or services and 422 if the code does not
/// apply.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>> {
    let code = Promotion::normalize_code(&body.code);
    let promotion = PromotionRepository::new(state.pool())
        .get_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("promotion code {code}")))?;
    let service = ServiceRepository::new(state.pool())
        .get_by_id(body.service_id)
        .await?
        .filter(|s| s.active)
        .ok_or_else(|| AppError::NotFound(format!("service {}", body.service_id)))?;

    let quote = Quote::compute(&service, Some(&promotion), Utc::now())?;
    Ok(Json(ValidateResponse {
        code,
        service_id: service.id,
        quote,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreatePromotionRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_into_new_normalizes_code() {
        let new = request(
            r#"{"code":" hemat10 ","rule":{"kind":"percentage","percent":"10","max_discount":"20000"}}"#,
        )
        .into_new()
        .unwrap();
        assert_eq!(new.code, "HEMAT10");
        assert!(new.categories.is_empty());
    }

    #[test]
    fn test_into_new_rejects_bad_input() {
        let bad_rule = request(r#"{"code":"X","rule":{"kind":"percentage","percent":"150"}}"#);
        assert!(matches!(bad_rule.into_new(), Err(AppError::Promotion(_))));

        let blank = request(r#"{"code":"  ","rule":{"kind":"fixed_amount","amount":"5000"}}"#);
        assert!(matches!(blank.into_new(), Err(AppError::BadRequest(_))));

        let inverted = request(
            r#"{"code":"X","rule":{"kind":"fixed_amount","amount":"5000"},
                "valid_from":"2026-03-10T00:00:00Z","valid_until":"2026-03-01T00:00:00Z"}"#,
        );
        assert!(matches!(inverted.into_new(), Err(AppError::BadRequest(_))));

        let zero_limit =
            request(r#"{"code":"X","rule":{"kind":"fixed_amount","amount":"5000"},"usage_limit":0}"#);
        assert!(matches!(zero_limit.into_new(), Err(AppError::BadRequest(_))));
    }
}
