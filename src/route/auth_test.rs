use poem::{http::StatusCode, test::TestClient};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    core::{
        security::{get_user_from_token, hash_password},
        session::get_session,
        test_utils::{generate_app_state, generate_test_user},
    },
    factory::user_profile::UserProfileFactory,
    init_openapi_route,
    model::user_profile::UserProfile,
    settings::get_config,
};

#[sqlx::test]
async fn test_login_then_logout(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let mut config = get_config();
    config.prefix = Some("/api".to_string());
    let (app_state, _) = generate_app_state(pool, &config)?;
    let mut factory = UserProfileFactory::<String>::new();
    factory.modified_one(|data, ext| UserProfile {
        email: Some("test_user@mail.com".to_string()),
        password: Some(ext),
        ..data.clone()
    });
    let user = factory
        .generate_one(&app_state.db, hash_password("password").unwrap())
        .await?;
    let app = init_openapi_route(app_state.clone(), &config);
    let cli = TestClient::new(app);

    // When login
    let resp = cli
        .post("/api/auth/login")
        .body_json(&json!({
            "email": "Test_User@mail.com",
            "password": "password"
        }))
        .send()
        .await;

    // Expect login
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let token: String = json.value().object().get("token").deserialize();
    json.value().object().get("token_type").assert_string("Bearer");
    let mut tx = app_state.db.begin().await?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let user_in_token = get_user_from_token(&mut tx, &mut redis_conn, Some(token.clone())).await?;
    assert!(user_in_token.is_some());
    assert_eq!(user_in_token.unwrap().id, user.id);

    // When logout
    let resp = cli
        .post("/api/auth/logout")
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await;

    // Expect logout
    resp.assert_status(StatusCode::NO_CONTENT);
    assert!(get_session(&mut redis_conn, token.clone())?.is_none());
    let resp = cli
        .post("/api/auth/logout")
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}

#[sqlx::test]
async fn test_login_invalid_credentials(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let mut config = get_config();
    config.prefix = Some("/api".to_string());
    let (app_state, _) = generate_app_state(pool, &config)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user@mail.com",
        "password",
    )
    .await?;
    // managed profile without a password
    let mut factory = UserProfileFactory::new();
    factory.modified_one(|data, _| UserProfile {
        email: Some("managed@mail.com".to_string()),
        password: None,
        ..data.clone()
    });
    factory.generate_one(&app_state.db, ()).await?;
    let app = init_openapi_route(app_state.clone(), &config);
    let cli = TestClient::new(app);

    for (email, password) in [
        ("test_user@mail.com", "wrong password"),
        ("unknown@mail.com", "password"),
        ("managed@mail.com", ""),
    ] {
        // When
        let resp = cli
            .post("/api/auth/login")
            .body_json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await;

        // Expect
        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.assert_json(&json!({"message": "Invalid credentials"}))
            .await;
    }
    Ok(())
}

#[sqlx::test]
async fn test_refresh_token(pool: PgPool) -> anyhow::Result<()> {
    // Given
    let mut config = get_config();
    config.prefix = Some("/api".to_string());
    let (app_state, _) = generate_app_state(pool, &config)?;
    let mut redis_conn = app_state.redis_conn.get()?;
    let test_user = generate_test_user(
        &app_state.db,
        &mut redis_conn,
        &config,
        "test_user@mail.com",
        "password",
    )
    .await?;
    let app = init_openapi_route(app_state.clone(), &config);
    let cli = TestClient::new(app);

    // When
    let resp = cli
        .post("/api/auth/refresh-token")
        .body_json(&json!({
            "refresh_token": test_user.refresh_token
        }))
        .send()
        .await;

    // Expect
    resp.assert_status_is_ok();
    let json = resp.json().await;
    let token: String = json.value().object().get("token").deserialize();
    let mut tx = app_state.db.begin().await?;
    let user_in_token = get_user_from_token(&mut tx, &mut redis_conn, Some(token)).await?;
    assert_eq!(user_in_token.map(|x| x.id), Some(test_user.user.id));

    // access token can not be used to refresh
    let resp = cli
        .post("/api/auth/refresh-token")
        .body_json(&json!({
            "refresh_token": test_user.token
        }))
        .send()
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    Ok(())
}
