//! Human-readable order tracking IDs.
//!
//! Format: `TK-YYYYMMDD-XXXXXX`, where the date is the UTC booking date and
//! the suffix is six uppercase alphanumerics. Customers read these over the
//! phone, so they are independent of the database primary key.

use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rand::distr::{Alphanumeric, Distribution};
use serde::{Deserialize, Serialize};

const PREFIX: &str = "TK";
const SUFFIX_LEN: usize = 6;
const DATE_FORMAT: &str = "%Y%m%d";

/// Errors that can occur when parsing a [`TrackingId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingIdError {
    #[error("tracking id must look like TK-YYYYMMDD-XXXXXX")]
    Malformed,
    #[error("tracking id has an invalid date: {0}")]
    InvalidDate(String),
    #[error("tracking id suffix must be {SUFFIX_LEN} uppercase letters or digits")]
    InvalidSuffix,
}

/// A unique, human-readable order identifier.
///
/// ```
/// use tuntas_kilat_core::TrackingId;
///
/// let id = TrackingId::parse("tk-20260301-ab12cd").unwrap();
/// assert_eq!(id.as_str(), "TK-20260301-AB12CD");
/// assert!(TrackingId::parse("TK-20261340-AB12CD").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingId(String);

impl TrackingId {
    /// Generate a fresh ID for an order booked at `at`.
    ///
    /// Uniqueness is enforced by the database; callers retry on conflict.
    pub fn generate<R: Rng + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(Alphanumeric.sample(rng)).to_ascii_uppercase())
            .collect();
        Self(format!(
            "{PREFIX}-{}-{suffix}",
            at.date_naive().format(DATE_FORMAT)
        ))
    }

    /// Parse user input, accepting lowercase and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingIdError`] if the input does not match the format.
    pub fn parse(s: &str) -> Result<Self, TrackingIdError> {
        let normalized = s.trim().to_ascii_uppercase();
        let mut parts = normalized.splitn(3, '-');
        let (Some(prefix), Some(date), Some(suffix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TrackingIdError::Malformed);
        };

        if prefix != PREFIX || date.len() != 8 {
            return Err(TrackingIdError::Malformed);
        }
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| TrackingIdError::InvalidDate(date.to_owned()))?;
        if suffix.len() != SUFFIX_LEN || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TrackingIdError::InvalidSuffix);
        }

        Ok(Self(normalized))
    }

    /// The booking date encoded in the ID.
    #[must_use]
    pub fn booking_date(&self) -> Option<NaiveDate> {
        self.0
            .get(3..11)
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TrackingId {
    type Err = TrackingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingId {
    type Error = TrackingIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingId> for String {
    fn from(id: TrackingId) -> Self {
        id.0
    }
}

impl AsRef<str> for TrackingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for TrackingId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for TrackingId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for TrackingId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
