//! Seed the service catalogue and promotion codes from YAML.
//!
//! Services are matched by name and updated in place; promotion codes that
//! already exist are left alone.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use tuntas_kilat_core::{DiscountRule, Price, ServiceCategory};
use tuntas_kilat_server::db::{
    NewPromotion, NewService, PromotionRepository, RepositoryError, ServiceRepository,
};
use tuntas_kilat_server::models::Promotion;

use super::{CommandError, connect};

/// Top-level catalogue file.
#[derive(Debug, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub promotions: Vec<PromotionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ServiceCategory,
    pub price: Price,
    pub duration_minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct PromotionEntry {
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

/// Counts reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub services_inserted: usize,
    pub services_updated: usize,
    pub promotions_inserted: usize,
    pub promotions_skipped: usize,
}

impl Catalogue {
    /// Parse and validate a catalogue document.
    pub fn parse(yaml: &str) -> Result<Self, CommandError> {
        let catalogue: Self =
            serde_yaml::from_str(yaml).map_err(|e| CommandError::Catalogue(e.to_string()))?;
        catalogue.validate()?;
        Ok(catalogue)
    }

    fn validate(&self) -> Result<(), CommandError> {
        let mut errors = Vec::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                errors.push("service with empty name".to_owned());
            }
            if service.price.is_negative() {
                errors.push(format!("{}: negative price", service.name));
            }
            if service.duration_minutes <= 0 {
                errors.push(format!("{}: duration must be positive", service.name));
            }
        }
        for promotion in &self.promotions {
            if Promotion::normalize_code(&promotion.code).is_empty() {
                errors.push("promotion with empty code".to_owned());
            }
            if let Err(e) = promotion.rule.validate() {
                errors.push(format!("{}: {e}", promotion.code));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Catalogue(errors.join("; ")))
        }
    }
}

impl From<&ServiceEntry> for NewService {
    fn from(entry: &ServiceEntry) -> Self {
        Self {
            name: entry.name.trim().to_owned(),
            description: entry.description.trim().to_owned(),
            category: entry.category,
            price: entry.price,
            duration_minutes: entry.duration_minutes,
        }
    }
}

impl From<&PromotionEntry> for NewPromotion {
    fn from(entry: &PromotionEntry) -> Self {
        Self {
            code: Promotion::normalize_code(&entry.code),
            description: entry.description.trim().to_owned(),
            rule: entry.rule,
            categories: entry.categories.clone(),
            min_order_amount: entry.min_order_amount,
            usage_limit: entry.usage_limit,
            valid_from: entry.valid_from,
            valid_until: entry.valid_until,
        }
    }
}

/// Seed from the catalogue at `file_path`.
pub async fn catalogue(file_path: &str) -> Result<SeedSummary, CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalogue");

    // Validate before touching the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let catalogue = Catalogue::parse(&content)?;
    info!(
        services = catalogue.services.len(),
        promotions = catalogue.promotions.len(),
        "Catalogue validated"
    );

    let pool = connect().await?;
    let mut summary = SeedSummary::default();

    let services = ServiceRepository::new(&pool);
    for entry in &catalogue.services {
        if services.upsert_by_name(&NewService::from(entry)).await? {
            summary.services_inserted += 1;
        } else {
            summary.services_updated += 1;
        }
    }

    let promotions = PromotionRepository::new(&pool);
    for entry in &catalogue.promotions {
        match promotions.create(&NewPromotion::from(entry)).await {
            Ok(_) => summary.promotions_inserted += 1,
            Err(RepositoryError::Conflict(_)) => {
                warn!(code = %entry.code, "Promotion code already exists, skipping");
                summary.promotions_skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Services inserted: {}", summary.services_inserted);
    info!("  Services updated: {}", summary.services_updated);
    info!("  Promotions inserted: {}", summary.promotions_inserted);
    info!("  Promotions skipped (already exist): {}", summary.promotions_skipped);

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_example_catalogue_parses() {
        let catalogue = Catalogue::parse(include_str!("../../catalogue.example.yaml")).unwrap();
        assert!(!catalogue.services.is_empty());
        assert!(
            catalogue
                .services
                .iter()
                .any(|s| s.category == ServiceCategory::LawnMowing)
        );
        assert!(!catalogue.promotions.is_empty());
    }

    #[test]
    fn test_invalid_entries_are_reported_together() {
        let yaml = r"
services:
  - name: Cuci Mobil
    category: car_wash
    price: -5
    duration_minutes: 0
promotions:
  - code: BAD
    rule: { kind: percentage, percent: 0 }
";
        let err = Catalogue::parse(yaml).unwrap_err().to_string();
        assert!(err.contains("negative price"));
        assert!(err.contains("duration must be positive"));
        assert!(err.contains("BAD"));
    }

    #[test]
    fn test_promotion_entry_normalizes_code() {
        let entry = PromotionEntry {
            code: " hemat10 ".to_owned(),
            description: String::new(),
            rule: DiscountRule::FixedAmount {
                amount: Price::from_rupiah(10_000),
            },
            categories: Vec::new(),
            min_order_amount: None,
            usage_limit: Some(100),
            valid_from: None,
            valid_until: None,
        };
        assert_eq!(NewPromotion::from(&entry).code, "HEMAT10");
    }
}
