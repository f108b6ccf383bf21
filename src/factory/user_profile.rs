use chrono::{DateTime, FixedOffset, NaiveDate};
use fake::{
    faker::{address::en::CityName, internet::en::SafeEmail, name::en::Name},
    Dummy, Fake, Faker,
};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::model::user_profile::UserProfile;

pub struct UserProfileFactory<T: Clone> {
    modifier_one: fn(x: &UserProfile, ext: T) -> UserProfile,
    modifier_many: fn(x: &UserProfile, idx: usize, ext: T) -> UserProfile,
}

impl<T: Clone> Default for UserProfileFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> UserProfileFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            modifier_many: |x, _, _| x.clone(),
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &UserProfile, ext: T) -> UserProfile) {
        self.modifier_one = modifier
    }

    pub fn modified_many(
        &mut self,
        modifier: fn(x: &UserProfile, idx: usize, ext: T) -> UserProfile,
    ) {
        self.modifier_many = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<UserProfile> {
        let data = UserProfileDummy::generate_one();
        let data = (self.modifier_one)(&data, ext);
        let mut tx = db.begin().await?;
        insert(&mut tx, &data).await?;
        tx.commit().await?;
        Ok(data)
    }

    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<UserProfile>> {
        let data = UserProfileDummy::generate_many(num);
        let mut result: Vec<UserProfile> = vec![];
        for (idx, item) in data.iter().enumerate() {
            result.push((self.modifier_many)(item, idx, ext.clone()));
        }
        let mut tx = db.begin().await?;
        for item in result.iter() {
            insert(&mut tx, item).await?;
        }
        tx.commit().await?;
        Ok(result)
    }
}

async fn insert(tx: &mut Transaction<'_, Postgres>, data: &UserProfile) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO public.user_profile (id, name, nickname, gender_id, dob, yob, birth_order, dod, yod,
            address, city, phone, email, password, photo_path, manager_id, created_date, updated_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
    )
    .bind(data.id)
    .bind(&data.name)
    .bind(&data.nickname)
    .bind(data.gender_id)
    .bind(data.dob)
    .bind(&data.yob)
    .bind(data.birth_order)
    .bind(data.dod)
    .bind(&data.yod)
    .bind(&data.address)
    .bind(&data.city)
    .bind(&data.phone)
    .bind(&data.email)
    .bind(&data.password)
    .bind(&data.photo_path)
    .bind(data.manager_id)
    .bind(data.created_date)
    .bind(data.updated_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Debug, Dummy, Clone)]
struct UserProfileDummy {
    pub id: Uuid,
    #[dummy(faker = "Name()")]
    pub name: String,
    #[dummy(faker = "Name()")]
    pub nickname: String,
    #[dummy(faker = "1..3")]
    pub gender_id: i16,
    #[dummy(faker = "1900..2020")]
    pub birth_year: i32,
    #[dummy(faker = "1..13")]
    pub birth_month: u32,
    #[dummy(faker = "1..29")]
    pub birth_day: u32,
    #[dummy(faker = "1..10")]
    pub birth_order: i32,
    #[dummy(faker = "CityName()")]
    pub city: String,
    #[dummy(faker = "SafeEmail()")]
    pub email: String,
    pub created_date: DateTime<FixedOffset>,
}

impl UserProfileDummy {
    fn to_user_profile(&self) -> UserProfile {
        let dob = NaiveDate::from_ymd_opt(self.birth_year, self.birth_month, self.birth_day);
        UserProfile {
            id: Uuid::now_v7(),
            name: Some(self.name.clone()),
            nickname: Some(self.nickname.clone()),
            gender_id: Some(self.gender_id),
            dob,
            yob: dob.map(|x| x.format("%Y").to_string()),
            birth_order: Some(self.birth_order),
            dod: None,
            yod: None,
            address: None,
            city: Some(self.city.clone()),
            phone: None,
            // unique column, keep it collision free
            email: Some(format!("{}.{}", self.id.simple(), self.email)),
            password: None,
            photo_path: None,
            manager_id: None,
            created_date: Some(self.created_date),
            updated_date: Some(self.created_date),
        }
    }

    pub fn generate_one() -> UserProfile {
        Faker.fake::<UserProfileDummy>().to_user_profile()
    }

    pub fn generate_many(num: u32) -> Vec<UserProfile> {
        let mut result: Vec<UserProfile> = vec![];
        for _ in 0..num {
            result.push(Faker.fake::<UserProfileDummy>().to_user_profile());
        }
        result
    }
}
