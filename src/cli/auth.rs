use chrono::Local;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    core::security::hash_password,
    model::user_profile::UserProfile,
    repository::user_profile::{create_user_profile, get_user_profile_by_email},
};

/// Create a self managed profile that can log in with `email` and `password`.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> anyhow::Result<UserProfile> {
    let mut tx = pool.begin().await?;

    let email = email.trim();
    if get_user_profile_by_email(&mut tx, email).await?.is_some() {
        anyhow::bail!("user with email {} already exists", email);
    }
    let hashed_password =
        hash_password(password).map_err(|err| anyhow::anyhow!("hash password: {}", err))?;
    let now = Local::now().fixed_offset();
    let mut user = UserProfile::new(Uuid::now_v7(), now);
    user.name = name.map(|x| x.to_string());
    user.email = Some(email.to_string());
    user.password = Some(hashed_password);
    create_user_profile(&mut tx, &user).await?;
    tx.commit().await?;
    Ok(user)
}
