use std::sync::Arc;

use chrono::Local;
use fake::{Fake, Faker};
use redis::ConnectionLike;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    security::{generate_refresh_token_from_user, generate_token_from_user, hash_password},
    session::add_session,
    storage::MemoryBlobStorage,
};
use crate::{
    model::user_profile::UserProfile, repository::user_profile::create_user_profile,
    settings::Config, AppState,
};

pub fn generate_random<T: fake::Dummy<fake::Faker>>() -> T {
    Faker.fake()
}

pub struct TestUser {
    pub user: UserProfile,
    pub token: String,
    pub refresh_token: String,
}

/// Insert a profile with login credentials and open a session for it.
pub async fn generate_test_user<C: ConnectionLike>(
    db: &PgPool,
    redis_conn: &mut C,
    config: &Config,
    email: &str,
    password: &str,
) -> anyhow::Result<TestUser> {
    let now = Local::now().fixed_offset();
    let mut user = UserProfile::new(Uuid::now_v7(), now);
    user.name = Some(generate_random::<String>());
    user.email = Some(email.to_string());
    user.password =
        Some(hash_password(password).map_err(|err| anyhow::anyhow!("hash password: {}", err))?);

    let mut tx = db.begin().await?;
    create_user_profile(&mut tx, &user).await?;
    tx.commit().await?;

    let token = generate_token_from_user(&user, config)?;
    let refresh_token = generate_refresh_token_from_user(&user, config)?;
    add_session(
        redis_conn,
        &user,
        config,
        token.clone(),
        refresh_token.clone(),
    )?;

    Ok(TestUser {
        user,
        token,
        refresh_token,
    })
}

/// App state backed by the test database and an in-memory blob store. The
/// store is returned as well so tests can inspect uploaded files.
pub fn generate_app_state(
    db: PgPool,
    config: &Config,
) -> anyhow::Result<(Arc<AppState>, Arc<MemoryBlobStorage>)> {
    let client = redis::Client::open(config.redis_url.clone())?;
    let redis_pool = r2d2::Pool::builder().build(client)?;
    let storage = Arc::new(MemoryBlobStorage::new());
    let app_state = Arc::new(AppState {
        db,
        redis_conn: redis_pool,
        storage: storage.clone(),
    });
    Ok((app_state, storage))
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::{
        core::{
            security::{get_user_from_token, verify_hash_password},
            session::get_session,
            test_utils::{generate_app_state, generate_test_user},
        },
        settings::get_config,
    };

    #[sqlx::test]
    async fn test_generate_test_user(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let config = get_config();
        let (app_state, _) = generate_app_state(pool, &config)?;
        let mut redis_conn = app_state.redis_conn.get()?;

        // When
        let res = generate_test_user(
            &app_state.db,
            &mut redis_conn,
            &config,
            "testuser@mail.com",
            "testpassword",
        )
        .await?;

        // Expect
        // is user exists on db
        let user: Option<(Uuid, String, String)> = sqlx::query_as(
            "SELECT id, email, password FROM public.user_profile WHERE id = $1",
        )
        .bind(res.user.id)
        .fetch_optional(&app_state.db)
        .await?;
        assert!(user.is_some());
        let user = user.unwrap();
        assert_eq!(user.1, "testuser@mail.com".to_string());
        assert!(verify_hash_password("testpassword", &user.2).unwrap());

        // is jwt token valid
        let mut tx = app_state.db.begin().await?;
        let user_token =
            get_user_from_token(&mut tx, &mut redis_conn, Some(res.token.clone())).await?;
        assert!(user_token.is_some());
        assert_eq!(user_token.unwrap().id, res.user.id);

        // is user exists on redis
        let session = get_session(&mut redis_conn, res.token)?;
        assert!(session.is_some());
        Ok(())
    }
}
