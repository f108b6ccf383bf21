use std::collections::HashMap;

use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::service::error::ValidationError;

#[derive(Object, Deserialize, Serialize)]
pub struct BadRequestResponse {
    pub message: String,
}

#[derive(Object, Deserialize, Serialize)]
pub struct UnauthorizedResponse {
    pub message: String,
}

impl Default for UnauthorizedResponse {
    fn default() -> Self {
        Self {
            message: "Unauthorized".to_string(),
        }
    }
}

#[derive(Object, Deserialize, Serialize)]
pub struct ForbiddenResponse {
    pub message: String,
}

impl Default for ForbiddenResponse {
    fn default() -> Self {
        Self {
            message: "Forbidden".to_string(),
        }
    }
}

#[derive(Object, Deserialize, Serialize)]
pub struct NotFoundResponse {
    pub message: String,
}

/// Field name to the reasons it was rejected.
#[derive(Object, Deserialize, Serialize)]
pub struct ValidationErrorResponse {
    pub message: String,
    pub errors: HashMap<String, Vec<String>>,
}

impl From<ValidationError> for ValidationErrorResponse {
    fn from(value: ValidationError) -> Self {
        Self {
            message: "The given data was invalid".to_string(),
            errors: value.fields.into_iter().collect(),
        }
    }
}

#[derive(Object, Deserialize, Serialize)]
pub struct InternalServerErrorResponse {
    pub message: String,
    pub error: String,
}

impl InternalServerErrorResponse {
    pub fn new(module: &str, function: &str, process: &str, err: &str) -> Self {
        tracing::error!("{}.{} failed on {}: {}", module, function, process, err);
        Self {
            message: "Internal Server Error".to_string(),
            error: format!("{}.{} failed on {}: {}", module, function, process, err),
        }
    }
}
