//! Core types for Tuntas Kilat.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod geo;
pub mod id;
pub mod phone;
pub mod price;
pub mod promotion;
pub mod status;
pub mod timeline;
pub mod tracking;

pub use geo::{
    AVERAGE_URBAN_SPEED_KMH, Coordinates, DEFAULT_ARRIVAL_RADIUS_KM, EARTH_RADIUS_KM, EtaEstimate,
    GeoError, eta_minutes, haversine_km,
};
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::Price;
pub use promotion::{DiscountRule, PromotionError, PromotionTerms};
pub use status::*;
pub use timeline::{Timeline, TimelineEntry, TransitionError, TransitionPolicy};
pub use tracking::{TrackingId, TrackingIdError};
