//! User profile routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use tuntas_kilat_core::{MembershipTier, PhoneNumber, UserId, UserRole};

use crate::db::{NewUser, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::Actor;
use crate::models::User;
use crate::routes::Pagination;
use crate::services::orders::require_admin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTierRequest {
    pub membership_tier: MembershipTier,
}

/// Create a customer profile for a newly authenticated user.
///
/// POST /api/users
///
/// # Errors
///
/// Returns 400 for an invalid name, phone or email and 409 if the phone
/// number is already registered.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    let phone = PhoneNumber::parse(&body.phone)?;
    let email = normalize_email(body.email.as_deref())?;

    let user = UserRepository::new(state.pool())
        .create(&NewUser {
            name: name.to_string(),
            phone,
            email,
            role: UserRole::Customer,
        })
        .await?;

    tracing::info!(user_id = %user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's profile.
///
/// GET /api/users/me
pub async fn me(Actor(user): Actor) -> Json<User> {
    Json(user)
}

/// List users.
///
/// GET /api/users?role=&limit=&offset=
///
/// # Errors
///
/// Returns 403 for non-admins.
pub async fn index(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<UserQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>> {
    require_admin(&actor)?;
    let (limit, offset) = page.bounds();
    let users = UserRepository::new(state.pool())
        .list(query.role, limit, offset)
        .await?;
    Ok(Json(users))
}

/// Change a user's membership tier.
///
/// PATCH /api/users/{id}/tier
///
/// # Errors
///
/// Returns 403 for non-admins and 404 for unknown users.
pub async fn update_tier(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateTierRequest>,
) -> Result<Json<User>> {
    require_admin(&actor)?;
    let user = UserRepository::new(state.pool())
        .update_tier(id, body.membership_tier)
        .await?;
    tracing::info!(user_id = %id, tier = %user.membership_tier, "Membership tier changed");
    Ok(Json(user))
}

/// Lowercase and sanity-check an optional email address.
fn normalize_email(email: Option<&str>) -> Result<Option<String>> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.contains(char::is_whitespace);
    if valid {
        Ok(Some(email.to_lowercase()))
    } else {
        Err(AppError::BadRequest("invalid email address".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(None).unwrap(), None);
        assert_eq!(normalize_email(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_email(Some(" Budi@Example.co.id ")).unwrap(),
            Some("budi@example.co.id".to_string())
        );
        assert!(normalize_email(Some("budi@localhost")).is_err());
        assert!(normalize_email(Some("@example.com")).is_err());
        assert!(normalize_email(Some("bu di@example.com")).is_err());
    }
}
