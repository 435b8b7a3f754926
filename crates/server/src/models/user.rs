//! Platform user model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{MembershipTier, PhoneNumber, UserId, UserRole};

/// A customer, worker, or admin account.
///
/// Credentials live with the upstream auth provider; this is the profile the
/// booking backend knows about.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub phone: PhoneNumber,
    pub email: Option<String>,
    pub role: UserRole,
    pub membership_tier: MembershipTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization() {
        let user = User {
            id: UserId::new(1),
            name: "Siti".to_string(),
            phone: PhoneNumber::parse("081234567890").expect("phone"),
            email: None,
            role: UserRole::Customer,
            membership_tier: MembershipTier::Gold,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).expect("serialize");
        assert!(json.contains("\"phone\":\"+6281234567890\""));
        assert!(json.contains("\"role\":\"customer\""));
        assert!(json.contains("\"membership_tier\":\"gold\""));
        assert!(!user.is_admin());
    }
}
