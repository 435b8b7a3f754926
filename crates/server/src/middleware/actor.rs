//! Caller identity extractors.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's ID in `x-user-id`. These extractors load that user so handlers see
//! a role they can authorize against.

use axum::{extract::FromRequestParts, http::request::Parts};

use tuntas_kilat_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::state::AppState;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor that requires a known caller.
///
/// Rejects with 401 when the header is missing, malformed, or names an
/// unknown user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Actor(user): Actor) -> Json<User> {
///     Json(user)
/// }
/// ```
pub struct Actor(pub User);

/// Extractor that loads the caller if one is identified.
pub struct OptionalActor(pub Option<User>);

/// Parse the caller ID header without touching the database.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the header is absent or not an ID.
pub fn caller_id(parts: &Parts) -> Result<UserId, AppError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing caller identity".to_string()))?;
    raw.to_str()
        .ok()
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or_else(|| AppError::Unauthorized("malformed caller identity".to_string()))
}

async fn load_user(state: &AppState, id: UserId) -> Result<User, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown caller".to_string()))?;

    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    set_sentry_user(&user.id);
    Ok(user)
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = caller_id(parts)?;
        Ok(Self(load_user(state, id).await?))
    }
}

impl FromRequestParts<AppState> for OptionalActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(USER_ID_HEADER).is_none() {
            return Ok(Self(None));
        }
        let id = caller_id(parts)?;
        Ok(Self(Some(load_user(state, id).await?)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/users/me");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_caller_id_parses_header() {
        let parts = parts_with(Some("42"));
        assert_eq!(caller_id(&parts).ok(), Some(UserId::new(42)));
    }

    #[test]
    fn test_caller_id_missing_or_malformed() {
        assert!(matches!(
            caller_id(&parts_with(None)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            caller_id(&parts_with(Some("admin"))),
            Err(AppError::Unauthorized(_))
        ));
    }
}
