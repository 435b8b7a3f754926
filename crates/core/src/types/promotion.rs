//! Promotion discount rules.
//!
//! A promotion code carries a [`DiscountRule`] plus eligibility terms. The
//! server stores both; this module decides whether a code applies to a
//! given subtotal and how much it takes off.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price::Price;
use super::status::ServiceCategory;

/// Why a promotion cannot be applied.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PromotionError {
    #[error("promotion is not active")]
    Inactive,
    #[error("promotion is not valid yet")]
    NotStarted,
    #[error("promotion has expired")]
    Expired,
    #[error("promotion usage limit reached")]
    UsageLimitReached,
    #[error("order total must be at least {minimum}")]
    BelowMinimum {
        /// Required subtotal.
        minimum: Price,
    },
    #[error("promotion does not apply to {0}")]
    CategoryNotEligible(ServiceCategory),
    #[error("invalid discount rule: {0}")]
    InvalidRule(String),
}

/// How much a promotion takes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscountRule {
    /// A percentage of the subtotal, optionally capped.
    Percentage {
        /// 0 < percent <= 100.
        percent: Decimal,
        /// Upper bound on the discount.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_discount: Option<Price>,
    },
    /// A flat amount.
    FixedAmount {
        /// Amount off.
        amount: Price,
    },
}

impl DiscountRule {
    /// Reject rules that could never produce a sensible discount.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::InvalidRule`] for out-of-range values.
    pub fn validate(&self) -> Result<(), PromotionError> {
        match self {
            Self::Percentage {
                percent,
                max_discount,
            } => {
                if *percent <= Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
                    return Err(PromotionError::InvalidRule(format!(
                        "percent must be in (0, 100], got {percent}"
                    )));
                }
                if max_discount.is_some_and(|m| m <= Price::ZERO) {
                    return Err(PromotionError::InvalidRule(
                        "max_discount must be positive".to_string(),
                    ));
                }
            }
            Self::FixedAmount { amount } => {
                if *amount <= Price::ZERO {
                    return Err(PromotionError::InvalidRule(
                        "amount must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Discount for `subtotal`, never more than the subtotal itself.
    #[must_use]
    pub fn discount_for(&self, subtotal: Price) -> Price {
        let raw = match self {
            Self::Percentage {
                percent,
                max_discount,
            } => {
                let pct = Price::new(subtotal.amount() * *percent / Decimal::ONE_HUNDRED).rounded();
                max_discount.map_or(pct, |cap| pct.min(cap))
            }
            Self::FixedAmount { amount } => *amount,
        };
        raw.min(subtotal).max(Price::ZERO)
    }
}

/// Eligibility terms attached to a promotion code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionTerms {
    pub rule: DiscountRule,
    pub active: bool,
    pub min_order_amount: Option<Price>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Empty means every category.
    #[serde(default)]
    pub categories: Vec<ServiceCategory>,
}

impl PromotionTerms {
    /// Check eligibility and compute the discount.
    ///
    /// # Errors
    ///
    /// Returns the first [`PromotionError`] that disqualifies the order.
    pub fn evaluate(
        &self,
        subtotal: Price,
        category: ServiceCategory,
        now: DateTime<Utc>,
    ) -> Result<Price, PromotionError> {
        if !self.active {
            return Err(PromotionError::Inactive);
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(PromotionError::NotStarted);
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(PromotionError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(PromotionError::UsageLimitReached);
        }
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(PromotionError::BelowMinimum { minimum });
        }
        if !self.categories.is_empty() && !self.categories.contains(&category) {
            return Err(PromotionError::CategoryNotEligible(category));
        }

        Ok(self.rule.discount_for(subtotal))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn percent(p: i64, cap: Option<i64>) -> DiscountRule {
        DiscountRule::Percentage {
            percent: Decimal::from(p),
            max_discount: cap.map(Price::from_rupiah),
        }
    }

    fn terms(rule: DiscountRule) -> PromotionTerms {
        PromotionTerms {
            rule,
            active: true,
            min_order_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_percentage_discount() {
        let rule = percent(10, None);
        assert_eq!(
            rule.discount_for(Price::from_rupiah(75_000)),
            Price::from_rupiah(7_500)
        );
    }

    #[test]
    fn test_percentage_respects_cap() {
        let rule = percent(50, Some(20_000));
        assert_eq!(
            rule.discount_for(Price::from_rupiah(100_000)),
            Price::from_rupiah(20_000)
        );
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let rule = DiscountRule::FixedAmount {
            amount: Price::from_rupiah(50_000),
        };
        assert_eq!(
            rule.discount_for(Price::from_rupiah(30_000)),
            Price::from_rupiah(30_000)
        );
    }

    #[test]
    fn test_rule_validation() {
        assert!(percent(0, None).validate().is_err());
        assert!(percent(101, None).validate().is_err());
        assert!(percent(100, None).validate().is_ok());
        assert!(percent(10, Some(0)).validate().is_err());
        assert!(
            DiscountRule::FixedAmount {
                amount: Price::ZERO
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_evaluate_window() {
        let now = Utc::now();
        let mut t = terms(percent(10, None));
        t.valid_from = Some(now + Duration::days(1));
        assert_eq!(
            t.evaluate(Price::from_rupiah(10_000), ServiceCategory::CarWash, now),
            Err(PromotionError::NotStarted)
        );

        t.valid_from = None;
        t.valid_until = Some(now - Duration::days(1));
        assert_eq!(
            t.evaluate(Price::from_rupiah(10_000), ServiceCategory::CarWash, now),
            Err(PromotionError::Expired)
        );
    }

    #[test]
    fn test_evaluate_usage_limit() {
        let mut t = terms(percent(10, None));
        t.usage_limit = Some(5);
        t.used_count = 5;
        assert_eq!(
            t.evaluate(
                Price::from_rupiah(10_000),
                ServiceCategory::CarWash,
                Utc::now()
            ),
            Err(PromotionError::UsageLimitReached)
        );
    }

    #[test]
    fn test_evaluate_minimum_and_category() {
        let mut t = terms(DiscountRule::FixedAmount {
            amount: Price::from_rupiah(5_000),
        });
        t.min_order_amount = Some(Price::from_rupiah(50_000));
        t.categories = vec![ServiceCategory::LawnMowing];

        assert_eq!(
            t.evaluate(
                Price::from_rupiah(40_000),
                ServiceCategory::LawnMowing,
                Utc::now()
            ),
            Err(PromotionError::BelowMinimum {
                minimum: Price::from_rupiah(50_000)
            })
        );
        assert_eq!(
            t.evaluate(
                Price::from_rupiah(60_000),
                ServiceCategory::CarWash,
                Utc::now()
            ),
            Err(PromotionError::CategoryNotEligible(ServiceCategory::CarWash))
        );
        assert_eq!(
            t.evaluate(
                Price::from_rupiah(60_000),
                ServiceCategory::LawnMowing,
                Utc::now()
            ),
            Ok(Price::from_rupiah(5_000))
        );
    }

    #[test]
    fn test_inactive() {
        let mut t = terms(percent(10, None));
        t.active = false;
        assert_eq!(
            t.evaluate(
                Price::from_rupiah(10_000),
                ServiceCategory::CarWash,
                Utc::now()
            ),
            Err(PromotionError::Inactive)
        );
    }

    #[test]
    fn test_rule_json_shape() {
        let json = serde_json::to_value(percent(15, Some(25_000))).unwrap();
        assert_eq!(json["kind"], "percentage");
        assert_eq!(json["percent"], "15");
        assert_eq!(json["max_discount"], "25000");
    }
}
