//! Status and classification enums.
//!
//! Each enum maps to a PostgreSQL enum type (with the `postgres` feature) and
//! serializes as the same lowercase/snake_case string the database uses.

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display`, and `FromStr` for a unit enum from one
/// variant/string table so the three can never drift apart.
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire/database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $label, ": {}"), s)),
                }
            }
        }
    };
}

/// Role of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Books services.
    #[default]
    Customer,
    /// Performs services in the field.
    Worker,
    /// Operates the platform.
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Worker => "worker",
    Admin => "admin",
});

/// Customer membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "membership_tier", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    #[default]
    Regular,
    Silver,
    Gold,
}

string_enum!(MembershipTier, "membership tier", {
    Regular => "regular",
    Silver => "silver",
    Gold => "gold",
});

/// Whether a worker is taking jobs.
///
/// Set by the worker (or an admin). Order assignment never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "worker_availability", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum WorkerAvailability {
    Available,
    Busy,
    #[default]
    Offline,
}

string_enum!(WorkerAvailability, "worker availability", {
    Available => "available",
    Busy => "busy",
    Offline => "offline",
});

/// Category of a bookable service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "service_category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    CarWash,
    MotorcycleWash,
    LawnMowing,
}

string_enum!(ServiceCategory, "service category", {
    CarWash => "car_wash",
    MotorcycleWash => "motorcycle_wash",
    LawnMowing => "lawn_mowing",
});

/// Payment state of an order. The gateway itself is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// Lifecycle status of an order.
///
/// The forward path is fixed:
///
/// ```text
/// pending -> confirmed -> assigned -> ontheway -> arrived -> inprogress -> completed
/// ```
///
/// `cancelled` is reachable from every non-terminal state. See
/// [`OrderStatus::validate_transition`] for the full rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Assigned,
    OnTheWay,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Assigned => "assigned",
    OnTheWay => "ontheway",
    Arrived => "arrived",
    InProgress => "inprogress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// The forward path, in order.
    pub const FORWARD_PATH: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Assigned,
        Self::OnTheWay,
        Self::Arrived,
        Self::InProgress,
        Self::Completed,
    ];

    /// States in which a worker is attached and working the order.
    pub const ACTIVE_FIELD_STATES: [Self; 4] =
        [Self::Assigned, Self::OnTheWay, Self::Arrived, Self::InProgress];

    /// Position on the forward path. `None` for `cancelled`.
    #[must_use]
    pub fn rank(self) -> Option<usize> {
        Self::FORWARD_PATH.iter().position(|s| *s == self)
    }

    /// The next state on the forward path, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Assigned),
            Self::Assigned => Some(Self::OnTheWay),
            Self::OnTheWay => Some(Self::Arrived),
            Self::Arrived => Some(Self::InProgress),
            Self::InProgress => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// `completed` and `cancelled` accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a worker is currently attached and in the field.
    #[must_use]
    pub fn is_active_field_state(self) -> bool {
        Self::ACTIVE_FIELD_STATES.contains(&self)
    }
}
