use poem_openapi::{payload::Json, types::multipart::Upload, ApiResponse, Multipart, Object};
use serde::Deserialize;

use crate::{
    core::utils::{date_to_string_opt, datetime_to_string_opt},
    model::{gender::Gender, user_profile::UserProfile},
};

use super::common::{
    ForbiddenResponse, InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
    ValidationErrorResponse,
};

#[derive(Object, Deserialize)]
pub struct DetailUserProfile {
    pub id: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub gender_id: Option<i16>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub yob: Option<String>,
    pub birth_order: Option<i32>,
    pub dod: Option<String>,
    pub yod: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo_path: Option<String>,
    pub manager_id: Option<String>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
}

impl From<UserProfile> for DetailUserProfile {
    fn from(value: UserProfile) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            nickname: value.nickname,
            gender_id: value.gender_id,
            gender: value
                .gender_id
                .and_then(Gender::from_id)
                .map(|x| x.label().to_string()),
            dob: date_to_string_opt(value.dob),
            yob: value.yob,
            birth_order: value.birth_order,
            dod: date_to_string_opt(value.dod),
            yod: value.yod,
            address: value.address,
            city: value.city,
            phone: value.phone,
            email: value.email,
            photo_path: value.photo_path,
            manager_id: value.manager_id.map(|x| x.to_string()),
            created_date: datetime_to_string_opt(value.created_date),
            updated_date: datetime_to_string_opt(value.updated_date),
        }
    }
}

#[derive(Object, Deserialize)]
pub struct SearchUserProfileResponse {
    pub q: String,
    pub results: Vec<DetailUserProfile>,
}

#[derive(ApiResponse)]
pub enum SearchUserProfileResponses {
    #[oai(status = 200)]
    Ok(Json<SearchUserProfileResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[allow(clippy::large_enum_variant)]
#[derive(ApiResponse)]
pub enum UserProfileDetailResponses {
    #[oai(status = 200)]
    Ok(Json<DetailUserProfile>),

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(Object, Deserialize)]
pub struct EditField {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Object, Deserialize)]
pub struct EditViewResponse {
    pub id: String,
    pub tab: String,
    pub requested_tab: Option<String>,
    pub tabs: Vec<String>,
    pub fields: Vec<EditField>,
}

#[derive(ApiResponse)]
pub enum EditViewResponses {
    #[oai(status = 200)]
    Ok(Json<EditViewResponse>),

    #[oai(status = 401)]
    Unauthorized(Json<UnauthorizedResponse>),

    #[oai(status = 403)]
    Forbidden(Json<ForbiddenResponse>),

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(Object, Deserialize)]
pub struct UpdateUserProfileResponse {
    pub tab: String,
    pub user_profile: DetailUserProfile,
}

#[allow(clippy::large_enum_variant)]
#[derive(ApiResponse)]
pub enum UpdateUserProfileResponses {
    #[oai(status = 200)]
    Ok(Json<UpdateUserProfileResponse>),

    #[oai(status = 401)]
    Unauthorized(Json<UnauthorizedResponse>),

    #[oai(status = 403)]
    Forbidden(Json<ForbiddenResponse>),

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),

    #[oai(status = 422)]
    UnprocessableEntity(Json<ValidationErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(Debug, Multipart)]
pub struct UploadPhotoRequest {
    pub photo: Upload,
}

#[allow(clippy::large_enum_variant)]
#[derive(ApiResponse)]
pub enum UploadPhotoResponses {
    #[oai(status = 200)]
    Ok(Json<DetailUserProfile>),

    #[oai(status = 401)]
    Unauthorized(Json<UnauthorizedResponse>),

    #[oai(status = 403)]
    Forbidden(Json<ForbiddenResponse>),

    #[oai(status = 404)]
    NotFound(Json<NotFoundResponse>),

    #[oai(status = 422)]
    UnprocessableEntity(Json<ValidationErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}

#[derive(Object, Deserialize)]
pub struct CreateManagedUserRequest {
    pub name: String,
    pub nickname: Option<String>,
    pub gender_id: i16,
}

#[allow(clippy::large_enum_variant)]
#[derive(ApiResponse)]
pub enum CreateManagedUserResponses {
    #[oai(status = 201)]
    Created(Json<DetailUserProfile>),

    #[oai(status = 401)]
    Unauthorized(Json<UnauthorizedResponse>),

    #[oai(status = 422)]
    UnprocessableEntity(Json<ValidationErrorResponse>),

    #[oai(status = 500)]
    InternalServerError(Json<InternalServerErrorResponse>),
}
