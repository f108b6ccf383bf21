use std::collections::BTreeMap;

use uuid::Uuid;

/// Every field that failed validation, with the reasons per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed for: {}", join_field_names(.fields))]
pub struct ValidationError {
    pub fields: BTreeMap<String, Vec<String>>,
}

fn join_field_names(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields.keys().cloned().collect::<Vec<String>>().join(", ")
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(|x| x.as_str()).collect()
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileEditError {
    #[error("user with id = {0} not found")]
    NotFound(Uuid),

    #[error("user {principal_id} is not allowed to {action} user {target_id}")]
    Unauthorized {
        principal_id: Uuid,
        target_id: Uuid,
        action: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("blob store error: {0}")]
    BlobStore(#[source] anyhow::Error),
}
