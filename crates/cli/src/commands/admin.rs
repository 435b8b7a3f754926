//! Account management commands.
//!
//! Admins cannot be created through the API, so the first admin (and any
//! after it) comes from here.

use tuntas_kilat_core::{PhoneNumber, UserId, UserRole};
use tuntas_kilat_server::db::{NewUser, UserRepository, WorkerRepository};

use super::{CommandError, connect};

/// Create a new admin user and return its ID.
pub async fn create_user(
    name: &str,
    phone: &str,
    email: Option<&str>,
) -> Result<UserId, CommandError> {
    let phone = PhoneNumber::parse(phone)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .create(&NewUser {
            name: name.trim().to_owned(),
            phone,
            email: email.map(|e| e.trim().to_lowercase()),
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!(
        "Admin user created! ID: {}, Phone: {}, Name: {}",
        user.id,
        user.phone,
        user.name
    );
    Ok(user.id)
}

/// Promote the user with `phone` to worker.
pub async fn promote_worker(phone: &str) -> Result<(), CommandError> {
    let phone = PhoneNumber::parse(phone)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .get_by_phone(&phone)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(phone.to_string()))?;

    let worker = WorkerRepository::new(&pool).promote(user.id).await?;
    tracing::info!(
        "User {} ({}) is now worker {}",
        user.name,
        user.id,
        worker.id
    );
    Ok(())
}
