use std::{collections::HashMap, sync::Arc};

use poem::web::Data;
use poem_openapi::{param::Query, payload::Json, OpenApi, Tags};
use uuid::Uuid;

use crate::{
    core::security::{get_user_from_token, BearerAuthorization},
    schema::{
        common::{
            ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse,
            UnauthorizedResponse, ValidationErrorResponse,
        },
        user_profile::{
            CreateManagedUserRequest, CreateManagedUserResponses, DetailUserProfile, EditField,
            EditViewResponse, EditViewResponses, SearchUserProfileResponse,
            SearchUserProfileResponses, UpdateUserProfileResponse, UpdateUserProfileResponses,
            UploadPhotoRequest, UploadPhotoResponses, UserProfileDetailResponses,
        },
    },
    service::{
        error::{ProfileEditError, ValidationError},
        form::{EditTab, ResolvedTab},
        principal::Principal,
        profile_edit::{
            apply_update, check_photo_size, create_managed_profile, resolve_edit_view,
            search_profiles, show_profile, upload_photo, NewManagedProfile,
        },
    },
    AppState,
};

#[derive(Tags)]
enum ApiUserProfileTags {
    UserProfile,
}

fn not_found(id: &str) -> Json<NotFoundResponse> {
    Json(NotFoundResponse {
        message: format!("user with id = {} not found", id),
    })
}

pub struct ApiUserProfile;

#[OpenApi]
impl ApiUserProfile {
    #[oai(
        path = "/user/search",
        method = "get",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn search_user_profile_api(
        &self,
        Query(q): Query<Option<String>>,
        state: Data<&Arc<AppState>>,
    ) -> SearchUserProfileResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return SearchUserProfileResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "search_user_profile_api",
                        "begin transaction",
                        &err.to_string(),
                    ),
                ));
            }
        };

        let q = q.unwrap_or_default();
        let data = match search_profiles(&mut tx, &q).await {
            Ok(val) => val,
            Err(err) => {
                return SearchUserProfileResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "search_user_profile_api",
                        "search_profiles",
                        &format!("{:#}", err),
                    ),
                ))
            }
        };
        SearchUserProfileResponses::Ok(Json(SearchUserProfileResponse {
            q,
            results: data.into_iter().map(DetailUserProfile::from).collect(),
        }))
    }

    #[oai(
        path = "/user/detail",
        method = "get",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn user_profile_detail_api(
        &self,
        Query(id): Query<String>,
        state: Data<&Arc<AppState>>,
    ) -> UserProfileDetailResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return UserProfileDetailResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "user_profile_detail_api",
                        "begin transaction",
                        &err.to_string(),
                    ),
                ));
            }
        };

        let Ok(user_id) = Uuid::parse_str(&id) else {
            return UserProfileDetailResponses::NotFound(not_found(&id));
        };
        match show_profile(&mut tx, &user_id).await {
            Ok(val) => UserProfileDetailResponses::Ok(Json(val.into())),
            Err(ProfileEditError::NotFound(_)) => {
                UserProfileDetailResponses::NotFound(not_found(&id))
            }
            Err(err) => UserProfileDetailResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.user_profile",
                    "user_profile_detail_api",
                    "show_profile",
                    &format!("{:#}", err),
                ),
            )),
        }
    }

    #[oai(
        path = "/user/edit",
        method = "get",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn edit_user_profile_api(
        &self,
        Query(id): Query<String>,
        Query(tab): Query<Option<String>>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> EditViewResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return EditViewResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "edit_user_profile_api",
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
                return EditViewResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "edit_user_profile_api",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        // Validate user token
        let request_user = match get_user_from_token(&mut tx, &mut redis_conn, auth.0.token).await
        {
            Ok(val) => val,
            Err(err) => {
                return EditViewResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "edit_user_profile_api",
                        "get user from token",
                        &err.to_string(),
                    ),
                ))
            }
        };
        let Some(request_user) = request_user else {
            return EditViewResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };

        let Ok(user_id) = Uuid::parse_str(&id) else {
            return EditViewResponses::NotFound(not_found(&id));
        };
        let principal = Principal::from_user(&request_user);
        match resolve_edit_view(&mut tx, &user_id, tab.as_deref(), &principal).await {
            Ok(view) => EditViewResponses::Ok(Json(EditViewResponse {
                id: view.profile.id.to_string(),
                tab: view.resolved.tab.as_str().to_string(),
                requested_tab: view.resolved.requested.clone(),
                tabs: EditTab::ALL.iter().map(|x| x.as_str().to_string()).collect(),
                fields: view
                    .field_values()
                    .into_iter()
                    .map(|(name, value)| EditField {
                        name: name.to_string(),
                        value,
                    })
                    .collect(),
            })),
            Err(ProfileEditError::NotFound(_)) => EditViewResponses::NotFound(not_found(&id)),
            Err(ProfileEditError::Unauthorized { .. }) => {
                EditViewResponses::Forbidden(Json(ForbiddenResponse::default()))
            }
            Err(err) => EditViewResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.user_profile",
                    "edit_user_profile_api",
                    "resolve_edit_view",
                    &format!("{:#}", err),
                ),
            )),
        }
    }

    #[oai(
        path = "/user/update",
        method = "post",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn update_user_profile_api(
        &self,
        Query(id): Query<String>,
        Query(tab): Query<Option<String>>,
        json: Json<HashMap<String, Option<String>>>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UpdateUserProfileResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return UpdateUserProfileResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "update_user_profile_api",
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
                return UpdateUserProfileResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "update_user_profile_api",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        // Validate user token
        let request_user = match get_user_from_token(&mut tx, &mut redis_conn, auth.0.token).await
        {
            Ok(val) => val,
            Err(err) => {
                return UpdateUserProfileResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "update_user_profile_api",
                        "get user from token",
                        &err.to_string(),
                    ),
                ))
            }
        };
        let Some(request_user) = request_user else {
            return UpdateUserProfileResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };

        let Ok(user_id) = Uuid::parse_str(&id) else {
            return UpdateUserProfileResponses::NotFound(not_found(&id));
        };
        let principal = Principal::from_user(&request_user);
        let user_profile =
            match apply_update(&mut tx, &user_id, tab.as_deref(), &json.0, &principal).await {
                Ok(val) => val,
                Err(ProfileEditError::NotFound(_)) => {
                    return UpdateUserProfileResponses::NotFound(not_found(&id))
                }
                Err(ProfileEditError::Unauthorized { .. }) => {
                    return UpdateUserProfileResponses::Forbidden(Json(
                        ForbiddenResponse::default(),
                    ))
                }
                Err(ProfileEditError::Validation(err)) => {
                    return UpdateUserProfileResponses::UnprocessableEntity(Json(err.into()))
                }
                Err(err) => {
                    return UpdateUserProfileResponses::InternalServerError(Json(
                        InternalServerErrorResponse::new(
                            "route.user_profile",
                            "update_user_profile_api",
                            "apply_update",
                            &format!("{:#}", err),
                        ),
                    ))
                }
            };

        if let Err(err) = tx.commit().await {
            return UpdateUserProfileResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.user_profile",
                    "update_user_profile_api",
                    "commit transaction",
                    &err.to_string(),
                ),
            ));
        }
        UpdateUserProfileResponses::Ok(Json(UpdateUserProfileResponse {
            tab: ResolvedTab::resolve(tab.as_deref()).tab.as_str().to_string(),
            user_profile: user_profile.into(),
        }))
    }

    #[oai(
        path = "/user/photo",
        method = "post",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn upload_user_photo_api(
        &self,
        Query(id): Query<String>,
        form: UploadPhotoRequest,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> UploadPhotoResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return UploadPhotoResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "upload_user_photo_api",
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
                return UploadPhotoResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "upload_user_photo_api",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        // Validate user token
        let request_user = match get_user_from_token(&mut tx, &mut redis_conn, auth.0.token).await
        {
            Ok(val) => val,
            Err(err) => {
                return UploadPhotoResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "upload_user_photo_api",
                        "get user from token",
                        &err.to_string(),
                    ),
                ))
            }
        };
        let Some(request_user) = request_user else {
            return UploadPhotoResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };

        let Ok(user_id) = Uuid::parse_str(&id) else {
            return UploadPhotoResponses::NotFound(not_found(&id));
        };
        if let Err(err) = check_photo_size(form.photo.size()) {
            return UploadPhotoResponses::UnprocessableEntity(Json(err.into()));
        }
        let bytes = match form.photo.into_vec().await {
            Ok(val) => val,
            Err(err) => {
                tracing::warn!("failed reading uploaded photo: {}", err);
                return UploadPhotoResponses::UnprocessableEntity(Json(
                    ValidationError::single("photo", "photo failed to upload").into(),
                ));
            }
        };
        let principal = Principal::from_user(&request_user);
        let user_profile = match upload_photo(
            &mut tx,
            state.storage.as_ref(),
            &user_id,
            &bytes,
            &principal,
        )
        .await
        {
            Ok(val) => val,
            Err(ProfileEditError::NotFound(_)) => {
                return UploadPhotoResponses::NotFound(not_found(&id))
            }
            Err(ProfileEditError::Unauthorized { .. }) => {
                return UploadPhotoResponses::Forbidden(Json(ForbiddenResponse::default()))
            }
            Err(ProfileEditError::Validation(err)) => {
                return UploadPhotoResponses::UnprocessableEntity(Json(err.into()))
            }
            Err(err) => {
                return UploadPhotoResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "upload_user_photo_api",
                        "upload_photo",
                        &format!("{:#}", err),
                    ),
                ))
            }
        };

        if let Err(err) = tx.commit().await {
            return UploadPhotoResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.user_profile",
                    "upload_user_photo_api",
                    "commit transaction",
                    &err.to_string(),
                ),
            ));
        }
        UploadPhotoResponses::Ok(Json(user_profile.into()))
    }

    #[oai(
        path = "/user/",
        method = "post",
        tag = "ApiUserProfileTags::UserProfile"
    )]
    async fn create_managed_user_api(
        &self,
        json: Json<CreateManagedUserRequest>,
        state: Data<&Arc<AppState>>,
        auth: BearerAuthorization,
    ) -> CreateManagedUserResponses {
        // Begin db transaction
        let mut tx = match state.db.begin().await {
            Ok(val) => val,
            Err(err) => {
                return CreateManagedUserResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "create_managed_user_api",
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
                return CreateManagedUserResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "create_managed_user_api",
                        "get redis pool connection",
                        &err.to_string(),
                    ),
                ))
            }
        };

        // Validate user token
        let request_user = match get_user_from_token(&mut tx, &mut redis_conn, auth.0.token).await
        {
            Ok(val) => val,
            Err(err) => {
                return CreateManagedUserResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "create_managed_user_api",
                        "get user from token",
                        &err.to_string(),
                    ),
                ))
            }
        };
        let Some(request_user) = request_user else {
            return CreateManagedUserResponses::Unauthorized(Json(UnauthorizedResponse::default()));
        };

        let principal = Principal::from_user(&request_user);
        let input = NewManagedProfile {
            name: json.0.name,
            nickname: json.0.nickname,
            gender_id: json.0.gender_id,
        };
        let user_profile = match create_managed_profile(&mut tx, input, &principal).await {
            Ok(val) => val,
            Err(ProfileEditError::Validation(err)) => {
                return CreateManagedUserResponses::UnprocessableEntity(Json(
                    ValidationErrorResponse::from(err),
                ))
            }
            Err(err) => {
                return CreateManagedUserResponses::InternalServerError(Json(
                    InternalServerErrorResponse::new(
                        "route.user_profile",
                        "create_managed_user_api",
                        "create_managed_profile",
                        &format!("{:#}", err),
                    ),
                ))
            }
        };

        if let Err(err) = tx.commit().await {
            return CreateManagedUserResponses::InternalServerError(Json(
                InternalServerErrorResponse::new(
                    "route.user_profile",
                    "create_managed_user_api",
                    "commit transaction",
                    &err.to_string(),
                ),
            ));
        }
        CreateManagedUserResponses::Created(Json(user_profile.into()))
    }
}
