use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const TABLE_NAME: &str = "public.user_profile";

#[derive(Clone, Debug, Deserialize, FromRow, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub gender_id: Option<i16>,
    pub dob: Option<NaiveDate>,
    pub yob: Option<String>,
    pub birth_order: Option<i32>,
    pub dod: Option<NaiveDate>,
    pub yod: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub photo_path: Option<String>,
    /// Profile of the user who manages this one. Lookup only, never owned.
    pub manager_id: Option<Uuid>,
    pub created_date: Option<DateTime<FixedOffset>>,
    pub updated_date: Option<DateTime<FixedOffset>>,
}

impl UserProfile {
    /// Empty profile with only an id and timestamps.
    pub fn new(id: Uuid, now: DateTime<FixedOffset>) -> Self {
        Self {
            id,
            name: None,
            nickname: None,
            gender_id: None,
            dob: None,
            yob: None,
            birth_order: None,
            dod: None,
            yod: None,
            address: None,
            city: None,
            phone: None,
            email: None,
            password: None,
            photo_path: None,
            manager_id: None,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }

    pub fn is_managed_by(&self, manager_id: &Uuid) -> bool {
        self.manager_id.as_ref() == Some(manager_id)
    }
}
