//! Indonesian mobile phone numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacters,
    #[error("phone number must be an Indonesian mobile number (08..., 628... or +628...)")]
    NotMobile,
    #[error("phone number must have between {min} and {max} digits")]
    BadLength {
        /// Minimum digits after the country code.
        min: usize,
        /// Maximum digits after the country code.
        max: usize,
    },
}

/// A mobile number normalized to E.164 (`+628...`).
///
/// The `users.phone` unique index relies on this canonical form.
///
/// ```
/// use tuntas_kilat_core::PhoneNumber;
///
/// let a = PhoneNumber::parse("0812-3456-7890").unwrap();
/// let b = PhoneNumber::parse("+62 812 3456 7890").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "+6281234567890");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Digits after `+62`, inclusive of the leading `8`.
    const MIN_SUBSCRIBER_DIGITS: usize = 9;
    const MAX_SUBSCRIBER_DIGITS: usize = 12;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError`] if the input is not an Indonesian mobile number.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (plus, rest) = trimmed
            .strip_prefix('+')
            .map_or((false, trimmed), |r| (true, r));
        if !rest
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(PhoneError::InvalidCharacters);
        }
        let digits: String = rest.chars().filter(char::is_ascii_digit).collect();

        let subscriber = if let Some(local) = digits.strip_prefix("62") {
            local
        } else if !plus && let Some(local) = digits.strip_prefix('0') {
            local
        } else {
            return Err(PhoneError::NotMobile);
        };

        if !subscriber.starts_with('8') {
            return Err(PhoneError::NotMobile);
        }
        if !(Self::MIN_SUBSCRIBER_DIGITS..=Self::MAX_SUBSCRIBER_DIGITS).contains(&subscriber.len())
        {
            return Err(PhoneError::BadLength {
                min: Self::MIN_SUBSCRIBER_DIGITS,
                max: Self::MAX_SUBSCRIBER_DIGITS,
            });
        }

        Ok(Self(format!("+62{subscriber}")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Stored values were normalized on insert.
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_international_forms_agree() {
        let expected = "+6281234567890";
        for input in [
            "081234567890",
            "0812-3456-7890",
            "6281234567890",
            "+6281234567890",
            " +62 812 3456 7890 ",
        ] {
            assert_eq!(PhoneNumber::parse(input).unwrap().as_str(), expected);
        }
    }

    #[test]
    fn test_rejects_landline_and_foreign() {
        assert_eq!(
            PhoneNumber::parse("0215551234"),
            Err(PhoneError::NotMobile)
        );
        assert_eq!(
            PhoneNumber::parse("+6591234567"),
            Err(PhoneError::NotMobile)
        );
        assert_eq!(PhoneNumber::parse("+0812345678"), Err(PhoneError::NotMobile));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(PhoneNumber::parse("  "), Err(PhoneError::Empty));
        assert_eq!(
            PhoneNumber::parse("0812abc"),
            Err(PhoneError::InvalidCharacters)
        );
        assert!(matches!(
            PhoneNumber::parse("0812"),
            Err(PhoneError::BadLength { .. })
        ));
    }
}
