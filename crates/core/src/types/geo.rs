//! Great-circle distance and travel-time estimates.
//!
//! Distances use the Haversine formula on a spherical Earth; ETAs assume a
//! flat average urban speed. They drive
//! customer-facing "your worker is ~12 minutes away" messages, not routing.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average speed through city traffic.
pub const AVERAGE_URBAN_SPEED_KMH: f64 = 30.0;

/// Radius around the customer inside which a worker counts as nearby.
pub const DEFAULT_ARRIVAL_RADIUS_KM: f64 = 0.1;

/// Invalid coordinate or speed input.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
    #[error("speed must be a positive number of km/h (got {0})")]
    InvalidSpeed(f64),
}

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Validate and build a coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if either component is out of range or not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Build from nullable database columns; `None` unless both are present.
    ///
    /// Stored values were validated on the way in and are not re-checked.
    #[must_use]
    pub const fn from_columns(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Self { lat, lng }),
            _ => None,
        }
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(*self, *other)
    }

    /// Whether `other` lies within `radius_km` of this point.
    #[must_use]
    pub fn is_within(&self, other: &Self, radius_km: f64) -> bool {
        self.distance_km(other) <= radius_km
    }
}

/// Haversine distance between two points, in kilometres.
///
/// Symmetric, non-negative, and zero for identical points.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Minutes needed to cover `distance_km` at `speed_kmh`.
///
/// # Errors
///
/// Returns [`GeoError::InvalidSpeed`] unless the speed is finite and positive.
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> Result<f64, GeoError> {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
        return Err(GeoError::InvalidSpeed(speed_kmh));
    }
    Ok(distance_km.max(0.0) / speed_kmh * 60.0)
}

/// Distance and travel time between a worker and a customer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtaEstimate {
    pub distance_km: f64,
    pub eta_minutes: f64,
}

impl EtaEstimate {
    /// Estimate at the default urban speed.
    #[must_use]
    pub fn between(from: Coordinates, to: Coordinates) -> Self {
        let distance_km = haversine_km(from, to);
        Self {
            distance_km,
            eta_minutes: distance_km / AVERAGE_URBAN_SPEED_KMH * 60.0,
        }
    }

    /// Estimate at a configured speed.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidSpeed`] for a non-positive speed.
    pub fn between_at_speed(
        from: Coordinates,
        to: Coordinates,
        speed_kmh: f64,
    ) -> Result<Self, GeoError> {
        let distance_km = haversine_km(from, to);
        Ok(Self {
            distance_km,
            eta_minutes: eta_minutes(distance_km, speed_kmh)?,
        })
    }

    /// ETA rounded up to whole minutes, for display.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // ceil of a small non-negative value
    pub fn whole_minutes(&self) -> u32 {
        self.eta_minutes.max(0.0).ceil() as u32
    }
}
