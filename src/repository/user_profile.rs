use chrono::{DateTime, FixedOffset};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    core::sqlx_utils::{binds_query_as, escape_like, query_builder, SqlxBinds},
    model::user_profile::{UserProfile, TABLE_NAME},
};

pub async fn get_user_profile_by_id(
    tx: &mut Transaction<'_, Postgres>,
    id: &Uuid,
) -> anyhow::Result<Option<UserProfile>> {
    let binds: Vec<SqlxBinds> = vec![SqlxBinds::Uuid(*id)];
    let filters: Vec<String> = vec!["id = $1".to_string()];
    let stmt = query_builder(None, TABLE_NAME, &filters, vec![], None);
    let user_profile = binds_query_as::<UserProfile>(&stmt, binds)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(user_profile)
}

pub async fn get_user_profile_by_email(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> anyhow::Result<Option<UserProfile>> {
    let binds: Vec<SqlxBinds> = vec![SqlxBinds::String(email.to_string())];
    let filters: Vec<String> = vec!["lower(email) = lower($1)".to_string()];
    let stmt = query_builder(None, TABLE_NAME, &filters, vec![], Some(1));
    let user_profile = binds_query_as::<UserProfile>(&stmt, binds)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(user_profile)
}

/// Profiles whose name contains `search`, case-insensitive, ordered by id.
pub async fn search_user_profile_by_name(
    tx: &mut Transaction<'_, Postgres>,
    search: &str,
) -> anyhow::Result<Vec<UserProfile>> {
    let binds: Vec<SqlxBinds> = vec![SqlxBinds::String(format!("%{}%", escape_like(search)))];
    let filters: Vec<String> = vec!["name ILIKE $1".to_string()];
    let stmt = query_builder(
        None,
        TABLE_NAME,
        &filters,
        vec!["id ASC".to_string()],
        None,
    );
    let data = binds_query_as::<UserProfile>(&stmt, binds)
        .fetch_all(&mut **tx)
        .await?;
    Ok(data)
}

pub async fn create_user_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &UserProfile,
) -> anyhow::Result<()> {
    sqlx::query(
        format!(
            r#"
        INSERT INTO {} (id, name, nickname, gender_id, dob, yob, birth_order, dod, yod,
            address, city, phone, email, password, photo_path, manager_id, created_date, updated_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(user_profile.id)
    .bind(&user_profile.name)
    .bind(&user_profile.nickname)
    .bind(user_profile.gender_id)
    .bind(user_profile.dob)
    .bind(&user_profile.yob)
    .bind(user_profile.birth_order)
    .bind(user_profile.dod)
    .bind(&user_profile.yod)
    .bind(&user_profile.address)
    .bind(&user_profile.city)
    .bind(&user_profile.phone)
    .bind(&user_profile.email)
    .bind(&user_profile.password)
    .bind(&user_profile.photo_path)
    .bind(user_profile.manager_id)
    .bind(user_profile.created_date)
    .bind(user_profile.updated_date)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_user_profile_personal(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &mut UserProfile,
    now: &DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    user_profile.updated_date = Some(*now);
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET nickname = $1, name = $2, gender_id = $3, dob = $4, yob = $5, birth_order = $6,
            updated_date = $7
            WHERE id = $8"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&user_profile.nickname)
    .bind(&user_profile.name)
    .bind(user_profile.gender_id)
    .bind(user_profile.dob)
    .bind(&user_profile.yob)
    .bind(user_profile.birth_order)
    .bind(now)
    .bind(user_profile.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_user_profile_contact_address(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &mut UserProfile,
    now: &DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    user_profile.updated_date = Some(*now);
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET address = $1, city = $2, phone = $3, updated_date = $4
            WHERE id = $5"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&user_profile.address)
    .bind(&user_profile.city)
    .bind(&user_profile.phone)
    .bind(now)
    .bind(user_profile.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_user_profile_login_account(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &mut UserProfile,
    now: &DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    user_profile.updated_date = Some(*now);
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET email = $1, password = $2, updated_date = $3
            WHERE id = $4"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&user_profile.email)
    .bind(&user_profile.password)
    .bind(now)
    .bind(user_profile.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_user_profile_death(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &mut UserProfile,
    now: &DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    user_profile.updated_date = Some(*now);
    sqlx::query(
        format!(
            r#"UPDATE {}
            SET dod = $1, yod = $2, updated_date = $3
            WHERE id = $4"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(user_profile.dod)
    .bind(&user_profile.yod)
    .bind(now)
    .bind(user_profile.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn update_user_profile_photo(
    tx: &mut Transaction<'_, Postgres>,
    user_profile: &mut UserProfile,
    now: &DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    user_profile.updated_date = Some(*now);
    sqlx::query(
        format!(
            r#"UPDATE {} SET photo_path = $1, updated_date = $2
            WHERE id = $3"#,
            TABLE_NAME
        )
        .as_str(),
    )
    .bind(&user_profile.photo_path)
    .bind(now)
    .bind(user_profile.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
