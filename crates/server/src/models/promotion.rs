//! Promotion code model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{DiscountRule, Price, PromotionId, PromotionTerms, ServiceCategory};

/// A promotion code and its usage counters.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Promotion {
    pub id: PromotionId,
    pub code: String,
    pub description: String,
    #[sqlx(json)]
    pub rule: DiscountRule,
    pub categories: Vec<ServiceCategory>,
    pub min_order_amount: Option<Price>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// Codes are matched case-insensitively and stored uppercase.
    #[must_use]
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// Eligibility terms for discount evaluation.
    #[must_use]
    pub fn terms(&self) -> PromotionTerms {
        PromotionTerms {
            rule: self.rule,
            active: self.active,
            min_order_amount: self.min_order_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            categories: self.categories.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(Promotion::normalize_code("  hemat10 "), "HEMAT10");
    }
}
