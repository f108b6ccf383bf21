use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Local};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use poem::Request;
use poem_openapi::{auth::Bearer, SecurityScheme};
use redis::ConnectionLike;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    model::user_profile::UserProfile, repository::user_profile::get_user_profile_by_id,
    settings::Config,
};

use super::session::get_session;

/// password hashing
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    // Argon2 with default params (Argon2id v19)
    let argon2 = Argon2::default();

    // Hash password to PHC string ($argon2id$v=19$...)
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(password_hash)
}

/// password hash verification
pub fn verify_hash_password(
    password: &str,
    password_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    let verify = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    Ok(verify)
}


pub struct Keys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: &str, email: &str, config: &Config) -> Self {
        let exp = (Local::now() + Duration::minutes(config.jwt_exp as i64)).timestamp();

        Self {
            id: user_id.to_string(),
            email: email.to_string(),
            exp,
        }
    }
}

/// Generate token
pub fn encode_token(claims: &Claims, jwt_secret: &str) -> anyhow::Result<String> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &keys.encoding)?;
    Ok(token)
}

/// Extract payload and Validate token
pub fn decode_token(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &keys.decoding, &Validation::default())?;
    Ok(token_data.claims)
}

pub fn generate_token_from_user(user: &UserProfile, config: &Config) -> anyhow::Result<String> {
    let claims = Claims::new(
        user.id.to_string().as_str(),
        user.email.as_deref().unwrap_or_default(),
        config,
    );
    let token = encode_token(&claims, &config.jwt_secret)?;
    Ok(token)
}

/// Resolve the logged in profile behind a bearer token.
pub async fn get_user_from_token<C: ConnectionLike>(
    tx: &mut Transaction<'_, Postgres>,
    redis_conn: &mut C,
    jwt_token: Option<String>,
) -> anyhow::Result<Option<UserProfile>> {
    let Some(jwt_token) = jwt_token else {
        return Ok(None);
    };
    let Some(session) = get_session(redis_conn, jwt_token)? else {
        return Ok(None);
    };
    let user_id = Uuid::parse_str(&session.user_id)?;
    let user = get_user_profile_by_id(tx, &user_id).await?;
    Ok(user)
}


#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimsRefresh {
    pub id: String,
    pub email: String,
    pub exp: i64,
    pub type_key: String,
}

impl ClaimsRefresh {
    pub fn new(user_id: &str, email: &str, config: &Config) -> Self {
        let exp = (Local::now() + Duration::minutes(config.jwt_refresh_exp as i64)).timestamp();

        Self {
            id: user_id.to_string(),
            email: email.to_string(),
            exp,
            type_key: "refresh".to_string(),
        }
    }
}

/// Generate refresh token
pub fn encode_refresh_token(claims: &ClaimsRefresh, jwt_secret: &str) -> anyhow::Result<String> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &keys.encoding)?;
    Ok(token)
}

/// Extract payload and Validate referesh token
pub fn decode_refresh_token(token: &str, jwt_secret: &str) -> anyhow::Result<ClaimsRefresh> {
    let keys = Keys::new(jwt_secret.as_bytes());
    let token_data = decode::<ClaimsRefresh>(token, &keys.decoding, &Validation::default())?;
    if token_data.claims.type_key != "refresh" {
        anyhow::bail!("token is not a refresh token");
    }
    Ok(token_data.claims)
}

pub fn generate_refresh_token_from_user(
    user: &UserProfile,
    config: &Config,
) -> anyhow::Result<String> {
    let claims = ClaimsRefresh::new(
        user.id.to_string().as_str(),
        user.email.as_deref().unwrap_or_default(),
        config,
    );
    let token = encode_refresh_token(&claims, &config.jwt_secret)?;
    Ok(token)
}

pub async fn get_user_from_refresh_token(
    tx: &mut Transaction<'_, Postgres>,
    refresh_token: Option<String>,
    config: &Config,
) -> anyhow::Result<Option<UserProfile>> {
    let Some(refresh_token) = refresh_token else {
        return Ok(None);
    };
    let Ok(claims) = decode_refresh_token(refresh_token.as_str(), &config.jwt_secret) else {
        return Ok(None);
    };
    let user_id = Uuid::parse_str(&claims.id)?;
    let user = get_user_profile_by_id(tx, &user_id).await?;
    Ok(user)
}

#[cfg(test)]
mod test_generate_refresh_token {
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::{
        core::security::{
            generate_refresh_token_from_user, generate_token_from_user,
            get_user_from_refresh_token,
        },
        factory::user_profile::UserProfileFactory,
        settings::get_config,
    };

    #[sqlx::test]
    async fn test_generate_refresh_token(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let config = get_config();
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let mut tx = pool.begin().await?;

        // When
        let token = generate_refresh_token_from_user(&user, &config)?;

        // Expect
        let token_user = get_user_from_refresh_token(&mut tx, Some(token), &config).await?;
        assert!(token_user.is_some());
        assert_eq!(token_user.unwrap().id, user.id);

        // access token is not accepted as refresh token
        let access_token = generate_token_from_user(&user, &config)?;
        let token_user = get_user_from_refresh_token(&mut tx, Some(access_token), &config).await?;
        assert!(token_user.is_none());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserApiKey {
    pub token: Option<String>,
}

/// ApiKey authorization
#[derive(SecurityScheme)]
#[oai(ty = "bearer", checker = "bearer_checker")]
pub struct BearerAuthorization(pub UserApiKey);

pub async fn bearer_checker(_req: &Request, api_key: Bearer) -> Option<UserApiKey> {
    Some(UserApiKey {
        token: Some(api_key.token),
    })
}
