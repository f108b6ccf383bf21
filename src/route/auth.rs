use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Local};
use poem::web::Data;
use poem_openapi::{payload::Json, OpenApi, Tags};
use redis::ConnectionLike;

use crate::{
    core::{
        security::{
            generate_refresh_token_from_user, generate_token_from_user,
            get_user_from_refresh_token, get_user_from_token, verify_hash_password,
            BearerAuthorization,
        },
        session::{add_session, remove_session},
        utils::datetime_to_string,
    },
    model::user_profile::UserProfile,
    repository::user_profile::get_user_profile_by_email,
    schema::{
        auth::{
            LoginRequest, LoginResponse, LoginResponses, LogoutResponses, RefreshTokenRequest,
            RefreshTokenResponses,
        },
        common::{BadRequestResponse, InternalServerErrorResponse, UnauthorizedResponse},
    },
    settings::{get_config, Config},
    AppState,
};

#[derive(Tags)]
enum ApiAuthTags {
    Auth,
}

/// Sign a token pair for `user` and open its session.
fn issue_tokens<C: ConnectionLike>(
    redis_conn: &mut C,
    user: &UserProfile,
    config: &Config,
) -> anyhow::Result<LoginResponse> {
    let token = generate_token_from_user(user, config).context("generate token")?;
    let refresh_token =
        generate_refresh_token_from_user(user, config).context("generate refresh token")?;
    add_session(
        redis_conn,
        user,
        config,
        token.clone(),
        refresh_token.clone(),
    )
    .context("add_session to redis")?;

    let now = Local::now().fixed_offset();
    let exp = now + Duration::minutes(config.jwt_exp as i64);
    let exp_refresh_token = now + Duration::minutes(config.jwt_refresh_exp as i64);
    Ok(LoginResponse {
        exp: datetime_to_string(exp),
        exp_in: config.jwt_exp as i64 * 60,
        exp_refresh_token: datetime_to_string(exp_refresh_token),
        refresh_token,
        token,
        token_type: "Bearer".to_string(),
    })
}

pub struct ApiAuth;

#[OpenApi]
impl ApiAuth {
    #[oai(path = "/auth/login", method = "post", tag = "ApiAuthTags::Auth")]
    async fn auth_login(
        &self,
        json: Json<LoginRequest>,
        state: Data<&Arc<AppState>>,
    ) -> LoginResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return LoginResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_login",
                        "begin transaction",
                        &err.to_string(),
                    ),
                ));
            }
        };

        // get redis conn from pool
        let mut redis_conn = match state.redis_conn.get() {
            Ok(val) => val,
            Err(err) => {
                return LoginResponses::InternalServerError(Json(InternalServerErrorResponse::new(
                    "route.auth",
                    "auth_login",
                    "get redis pool connection",
                    &err.to_string(),
                )))
            }
        };

        let user = match get_user_profile_by_email(&mut tx, json.email.trim()).await {
            Ok(val) => val,
            Err(err) => {
                return LoginResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_login",
                        "check user on database",
                        &err.to_string(),
                    ),
                ));
            }
        };
        // managed profiles without credentials cannot log in
        let Some((user, password_hash)) =
            user.and_then(|x| x.password.clone().map(|password| (x, password)))
        else {
            return LoginResponses::BadRequest(Json(BadRequestResponse {
                message: "Invalid credentials".to_string(),
            }));
        };

        let is_valid = match verify_hash_password(&json.password, &password_hash) {
            Ok(val) => val,
            Err(err) => {
                return LoginResponses::InternalServerError(Json(InternalServerErrorResponse::new(
                    "route.auth",
                    "auth_login",
                    "validate user password",
                    &err.to_string(),
                )))
            }
        };
        if !is_valid {
            return LoginResponses::BadRequest(Json(BadRequestResponse {
                message: "Invalid credentials".to_string(),
            }));
        }

        let config = get_config();
        match issue_tokens(&mut redis_conn, &user, &config) {
            Ok(val) => {
                tracing::info!("user {} logged in", user.id);
                LoginResponses::Ok(Json(val))
            }
            Err(err) => LoginResponses::InternalServerError(Json(InternalServerErrorResponse::new(
                "route.auth",
                "auth_login",
                "issue tokens",
                &format!("{:#}", err),
            ))),
        }
    }

    #[oai(
        path = "/auth/refresh-token",
        method = "post",
        tag = "ApiAuthTags::Auth"
    )]
    async fn auth_refresh_token(
        &self,
        json: Json<RefreshTokenRequest>,
        state: Data<&Arc<AppState>>,
    ) -> RefreshTokenResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return RefreshTokenResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_refresh_token",
                        "begin transaction",
                        &err.to_string(),
                    ),
                ));
            }
        };

        // get redis conn from pool
        let mut redis_conn = match state.redis_conn.get() {
            Ok(val) => val,
            Err(err) => {
                return RefreshTokenResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_refresh_token",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        let config = get_config();
        let refresh_token_user =
            match get_user_from_refresh_token(&mut tx, Some(json.refresh_token.clone()), &config)
                .await
            {
                Ok(val) => val,
                Err(err) => {
                    return RefreshTokenResponses::InternalServerError(Json(
                        InternalServerErrorResponse::new(
                            "route.auth",
                            "auth_refresh_token",
                            "get user from refresh token",
                            &err.to_string(),
                        ),
                    ))
                }
            };
        let Some(refresh_token_user) = refresh_token_user else {
            return RefreshTokenResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };

        match issue_tokens(&mut redis_conn, &refresh_token_user, &config) {
            Ok(val) => RefreshTokenResponses::Ok(Json(val)),
            Err(err) => RefreshTokenResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.auth",
                    "auth_refresh_token",
                    "issue tokens",
                    &format!("{:#}", err),
                ),
            )),
        }
    }

    #[oai(path = "/auth/logout", method = "post", tag = "ApiAuthTags::Auth")]
    async fn auth_logout(
        &self,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> LogoutResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return LogoutResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_logout",
                        "begin transaction",
                        &err.to_string(),
                    ),
                ));
            }
        };

        // get redis conn from pool
        let mut redis_conn = match state.redis_conn.get() {
            Ok(val) => val,
            Err(err) => {
                return LogoutResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_logout",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        // Validate user token
        let jwt_token = auth.0.token;
        let user = match get_user_from_token(&mut tx, &mut redis_conn, jwt_token.clone()).await {
            Ok(val) => val,
            Err(err) => {
                return LogoutResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.auth",
                        "auth_logout",
                        "get user from token",
                        &err.to_string(),
                    ),
                ))
            }
        };
        let (Some(_), Some(jwt_token)) = (user, jwt_token) else {
            return LogoutResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };
        if let Err(err) = remove_session(&mut redis_conn, jwt_token) {
            return LogoutResponses::InternalServerError(Json(InternalServerErrorResponse::new(
                "route.auth",
                "auth_logout",
                "remove session",
                &err.to_string(),
            )));
        }
        LogoutResponses::NoContent
    }
}
