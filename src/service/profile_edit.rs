use chrono::Local;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    core::{image::ImageFormat, storage::BlobStorage},
    model::{gender::Gender, user_profile::UserProfile},
    repository::user_profile::{
        create_user_profile, get_user_profile_by_email, get_user_profile_by_id,
        search_user_profile_by_name, update_user_profile_contact_address,
        update_user_profile_death, update_user_profile_login_account,
        update_user_profile_personal, update_user_profile_photo,
    },
};

use super::{
    error::{ProfileEditError, ValidationError},
    form::{EditTab, ResolvedTab, SubmittedFields, TabUpdate},
    principal::Principal,
};

pub const MAX_PHOTO_SIZE: usize = 2 * 1024 * 1024;

/// Profile being edited and the tab to show for it.
#[derive(Clone, Debug)]
pub struct EditView {
    pub profile: UserProfile,
    pub resolved: ResolvedTab,
}

impl EditView {
    pub fn field_values(&self) -> Vec<(&'static str, Option<String>)> {
        self.resolved.tab.field_values(&self.profile)
    }
}

#[derive(Clone, Debug)]
pub struct NewManagedProfile {
    pub name: String,
    pub nickname: Option<String>,
    pub gender_id: i16,
}

async fn load_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &Uuid,
) -> Result<UserProfile, ProfileEditError> {
    get_user_profile_by_id(tx, user_id)
        .await
        .map_err(ProfileEditError::Store)?
        .ok_or(ProfileEditError::NotFound(*user_id))
}

fn unauthorized(principal: &Principal, target: &UserProfile, action: &'static str) -> ProfileEditError {
    tracing::warn!(
        "user {} is not allowed to {} user {}",
        principal.id,
        action,
        target.id
    );
    ProfileEditError::Unauthorized {
        principal_id: principal.id,
        target_id: target.id,
        action,
    }
}

pub async fn show_profile(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &Uuid,
) -> Result<UserProfile, ProfileEditError> {
    load_profile(tx, user_id).await
}

pub async fn resolve_edit_view(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &Uuid,
    requested_tab: Option<&str>,
    principal: &Principal,
) -> Result<EditView, ProfileEditError> {
    let profile = load_profile(tx, user_id).await?;
    if !principal.can_edit(&profile) {
        return Err(unauthorized(principal, &profile, "edit"));
    }
    let resolved = ResolvedTab::resolve(requested_tab);
    if resolved.is_fallback() {
        tracing::debug!(
            "unknown tab {:?} requested, showing {}",
            resolved.requested,
            resolved.tab.as_str()
        );
    }
    Ok(EditView { profile, resolved })
}

/// Validate and persist one tab submission. Nothing is written unless the
/// principal may edit the profile and every submitted field is valid.
pub async fn apply_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &Uuid,
    requested_tab: Option<&str>,
    fields: &SubmittedFields,
    principal: &Principal,
) -> Result<UserProfile, ProfileEditError> {
    let mut profile = load_profile(tx, user_id).await?;
    if !principal.can_edit(&profile) {
        return Err(unauthorized(principal, &profile, "edit"));
    }

    let tab = ResolvedTab::resolve(requested_tab).tab;
    let update = TabUpdate::parse(tab, fields)?;
    if let Some(email) = update.submitted_email() {
        let owner = get_user_profile_by_email(tx, email)
            .await
            .map_err(ProfileEditError::Store)?;
        if owner.is_some_and(|x| x.id != profile.id) {
            return Err(email_taken().into());
        }
    }

    update
        .apply_to(&mut profile)
        .map_err(ProfileEditError::Store)?;
    let now = Local::now().fixed_offset();
    let res = match tab {
        EditTab::Profile => update_user_profile_personal(tx, &mut profile, &now).await,
        EditTab::ContactAddress => {
            update_user_profile_contact_address(tx, &mut profile, &now).await
        }
        EditTab::LoginAccount => update_user_profile_login_account(tx, &mut profile, &now).await,
        EditTab::Death => update_user_profile_death(tx, &mut profile, &now).await,
    };
    if let Err(err) = res {
        // email claimed by a concurrent write after the check above
        if tab == EditTab::LoginAccount && is_unique_violation(&err) {
            return Err(email_taken().into());
        }
        return Err(ProfileEditError::Store(err));
    }
    tracing::info!(
        "user {} updated tab {} of user {}",
        principal.id,
        tab.as_str(),
        profile.id
    );
    Ok(profile)
}

fn email_taken() -> ValidationError {
    ValidationError::single("email", "email has already been taken")
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Size limit of an uploaded photo, checkable before its content is read.
pub fn check_photo_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_PHOTO_SIZE {
        return Err(ValidationError::single(
            "photo",
            format!("photo may not be greater than {} kilobytes", MAX_PHOTO_SIZE / 1024),
        ));
    }
    Ok(())
}

/// Store a new photo for the principal's own profile.
///
/// The blob is written before the profile row. When the row update fails the
/// stored blob is left behind.
pub async fn upload_photo(
    tx: &mut Transaction<'_, Postgres>,
    storage: &dyn BlobStorage,
    user_id: &Uuid,
    bytes: &[u8],
    principal: &Principal,
) -> Result<UserProfile, ProfileEditError> {
    let mut profile = load_profile(tx, user_id).await?;
    if !principal.can_upload_photo(&profile) {
        return Err(unauthorized(principal, &profile, "upload photo for"));
    }

    if bytes.is_empty() {
        return Err(ValidationError::single("photo", "photo is required").into());
    }
    check_photo_size(bytes.len())?;
    let Some(format) = ImageFormat::detect(bytes) else {
        return Err(ValidationError::single(
            "photo",
            "photo must be an image (png, jpg, gif or webp)",
        )
        .into());
    };

    let suggested_name = format!("users/{}.{}", Uuid::now_v7(), format.extension());
    let path = storage
        .store(bytes, &suggested_name)
        .await
        .map_err(ProfileEditError::BlobStore)?;
    profile.photo_path = Some(path);
    let now = Local::now().fixed_offset();
    update_user_profile_photo(tx, &mut profile, &now)
        .await
        .map_err(ProfileEditError::Store)?;
    tracing::info!(
        "user {} uploaded photo {:?}",
        profile.id,
        profile.photo_path
    );
    Ok(profile)
}

/// Profiles whose name contains `query`. A blank query matches nothing.
pub async fn search_profiles(
    tx: &mut Transaction<'_, Postgres>,
    query: &str,
) -> Result<Vec<UserProfile>, ProfileEditError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(vec![]);
    }
    search_user_profile_by_name(tx, query)
        .await
        .map_err(ProfileEditError::Store)
}

/// Create a profile managed by the principal. Login credentials are added
/// later through the login account tab.
pub async fn create_managed_profile(
    tx: &mut Transaction<'_, Postgres>,
    input: NewManagedProfile,
    principal: &Principal,
) -> Result<UserProfile, ProfileEditError> {
    let mut errors = ValidationError::new();
    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "name is required");
    } else if name.chars().count() > 255 {
        errors.add("name", "name may not be greater than 255 characters");
    }
    let nickname = input
        .nickname
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty());
    if nickname.as_ref().is_some_and(|x| x.chars().count() > 255) {
        errors.add("nickname", "nickname may not be greater than 255 characters");
    }
    if Gender::from_id(input.gender_id).is_none() {
        errors.add("gender_id", "gender_id must be 1 (male) or 2 (female)");
    }
    let (name, nickname) = errors.into_result((name, nickname))?;

    let now = Local::now().fixed_offset();
    let mut profile = UserProfile::new(Uuid::now_v7(), now);
    profile.name = Some(name);
    profile.nickname = nickname;
    profile.gender_id = Some(input.gender_id);
    profile.manager_id = Some(principal.id);
    create_user_profile(tx, &profile)
        .await
        .map_err(ProfileEditError::Store)?;
    tracing::info!("user {} created managed user {}", principal.id, profile.id);
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use sqlx::PgPool;
    use uuid::Uuid;

    use super::*;
    use crate::{
        core::{security::verify_hash_password, storage::MemoryBlobStorage},
        factory::user_profile::UserProfileFactory,
    };

    fn fields(items: &[(&str, &str)]) -> SubmittedFields {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect::<HashMap<String, Option<String>>>()
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

    #[sqlx::test]
    async fn test_search_profiles(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::<Vec<&str>>::new();
        factory.modified_many(|data, idx, ext| UserProfile {
            name: Some(ext[idx].to_string()),
            ..data.clone()
        });
        factory
            .generate_many(&pool, 3, vec!["Jono", "Jeni", "Johan"])
            .await?;
        let mut tx = pool.begin().await?;

        // When
        let res = search_profiles(&mut tx, "jo").await?;

        // Expect
        let names: Vec<String> = res.into_iter().filter_map(|x| x.name).collect();
        assert_eq!(names, vec!["Jono".to_string(), "Johan".to_string()]);
        assert!(search_profiles(&mut tx, "").await?.is_empty());
        assert!(search_profiles(&mut tx, "   ").await?.is_empty());
        Ok(())
    }

    #[sqlx::test]
    async fn test_apply_update_profile_tab(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let principal = Principal::from_user(&user);
        let mut tx = pool.begin().await?;

        // When
        let res = apply_update(
            &mut tx,
            &user.id,
            None,
            &fields(&[
                ("nickname", "Nama Panggilan"),
                ("name", "Nama User"),
                ("gender_id", "1"),
                ("dob", "1959-06-09"),
                ("yob", ""),
                ("birth_order", "3"),
            ]),
            &principal,
        )
        .await?;
        tx.commit().await?;

        // Expect
        assert_eq!(res.yob, Some("1959".to_string()));
        let mut tx = pool.begin().await?;
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        assert_eq!(saved.name, Some("Nama User".to_string()));
        assert_eq!(saved.dob, NaiveDate::from_ymd_opt(1959, 6, 9));
        assert_eq!(saved.yob, Some("1959".to_string()));
        assert_eq!(saved.birth_order, Some(3));
        // other tabs untouched
        assert_eq!(saved.city, user.city);
        assert_eq!(saved.email, user.email);
        Ok(())
    }

    #[sqlx::test]
    async fn test_apply_update_rejects_stranger(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let stranger = factory.generate_one(&pool, ()).await?;
        let mut tx = pool.begin().await?;

        // When
        let res = apply_update(
            &mut tx,
            &user.id,
            Some("login_account"),
            &fields(&[("email", "user@mail.com"), ("password", "Secr3t")]),
            &Principal::from_user(&stranger),
        )
        .await;

        // Expect
        assert!(matches!(res, Err(ProfileEditError::Unauthorized { .. })));
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        assert_eq!(saved.email, user.email);
        assert!(saved.password.is_none());
        Ok(())
    }

    #[sqlx::test]
    async fn test_manager_sets_login_account(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut manager_factory = UserProfileFactory::new();
        let manager = manager_factory.generate_one(&pool, ()).await?;
        let mut factory = UserProfileFactory::<Uuid>::new();
        factory.modified_one(|data, ext| UserProfile {
            manager_id: Some(ext),
            ..data.clone()
        });
        let user = factory.generate_one(&pool, manager.id).await?;
        let mut tx = pool.begin().await?;

        // When
        let res = apply_update(
            &mut tx,
            &user.id,
            Some("login_account"),
            &fields(&[("email", "user@mail.com"), ("password", "Secr3t")]),
            &Principal::from_user(&manager),
        )
        .await?;

        // Expect
        assert_eq!(res.email, Some("user@mail.com".to_string()));
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        let hash = saved.password.unwrap();
        assert_ne!(hash, "Secr3t".to_string());
        assert!(verify_hash_password("Secr3t", &hash).unwrap());
        Ok(())
    }

    #[sqlx::test]
    async fn test_email_taken(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let other = factory.generate_one(&pool, ()).await?;
        let mut tx = pool.begin().await?;

        // When
        let res = apply_update(
            &mut tx,
            &user.id,
            Some("login_account"),
            &fields(&[("email", other.email.as_deref().unwrap())]),
            &Principal::from_user(&user),
        )
        .await;

        // Expect
        match res {
            Err(ProfileEditError::Validation(err)) => {
                assert_eq!(err.field_names(), vec!["email"])
            }
            other => panic!("unexpected result: {:?}", other),
        }

        // keeping the own email is fine
        let res = apply_update(
            &mut tx,
            &user.id,
            Some("login_account"),
            &fields(&[("email", user.email.as_deref().unwrap())]),
            &Principal::from_user(&user),
        )
        .await;
        assert!(res.is_ok());
        Ok(())
    }

    #[sqlx::test]
    async fn test_duplicate_email_write_is_unique_violation(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let mut user = factory.generate_one(&pool, ()).await?;
        let other = factory.generate_one(&pool, ()).await?;
        let mut tx = pool.begin().await?;
        user.email = other.email.map(|x| x.to_uppercase());

        // When
        let now = Local::now().fixed_offset();
        let err = update_user_profile_login_account(&mut tx, &mut user, &now)
            .await
            .unwrap_err();

        // Expect
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&anyhow::anyhow!("other failure")));
        Ok(())
    }

    #[sqlx::test]
    async fn test_email_taken_by_concurrent_update(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let other = factory.generate_one(&pool, ()).await?;
        // other claims the email in a transaction that is not committed yet
        let mut other_tx = pool.begin().await?;
        sqlx::query("UPDATE public.user_profile SET email = $1 WHERE id = $2")
            .bind("race@mail.com")
            .bind(other.id)
            .execute(&mut *other_tx)
            .await?;
        let mut tx = pool.begin().await?;

        // When
        let submitted = fields(&[("email", "race@mail.com")]);
        let principal = Principal::from_user(&user);
        let (res, committed) = tokio::join!(
            apply_update(
                &mut tx,
                &user.id,
                Some("login_account"),
                &submitted,
                &principal,
            ),
            async {
                tokio::time::sleep(std::time::Duration::from_millis(300)).await;
                other_tx.commit().await
            }
        );

        // Expect
        committed?;
        match res {
            Err(ProfileEditError::Validation(err)) => {
                assert_eq!(err.field_names(), vec!["email"])
            }
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }

    #[sqlx::test]
    async fn test_resolve_edit_view(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let stranger = factory.generate_one(&pool, ()).await?;
        let mut tx = pool.begin().await?;

        // When
        let view = resolve_edit_view(
            &mut tx,
            &user.id,
            Some("invalid_tab"),
            &Principal::from_user(&user),
        )
        .await?;

        // Expect
        assert_eq!(view.resolved.tab, EditTab::Profile);
        assert_eq!(view.resolved.requested, Some("invalid_tab".to_string()));
        let names: Vec<&str> = view.field_values().into_iter().map(|x| x.0).collect();
        assert!(names.contains(&"nickname"));
        assert!(names.contains(&"name"));

        let res = resolve_edit_view(
            &mut tx,
            &user.id,
            None,
            &Principal::from_user(&stranger),
        )
        .await;
        assert!(matches!(res, Err(ProfileEditError::Unauthorized { .. })));
        let res = resolve_edit_view(
            &mut tx,
            &Uuid::now_v7(),
            None,
            &Principal::from_user(&user),
        )
        .await;
        assert!(matches!(res, Err(ProfileEditError::NotFound(_))));
        Ok(())
    }

    #[sqlx::test]
    async fn test_upload_photo(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let storage = MemoryBlobStorage::new();
        let mut tx = pool.begin().await?;

        // When
        let res = upload_photo(
            &mut tx,
            &storage,
            &user.id,
            PNG,
            &Principal::from_user(&user),
        )
        .await?;

        // Expect
        assert!(res.photo_path.is_some());
        let path = res.photo_path.unwrap();
        assert!(path.ends_with(".png"));
        assert!(storage.exists(&path).await);
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        assert_eq!(saved.photo_path, Some(path));
        Ok(())
    }

    #[sqlx::test]
    async fn test_upload_photo_rejects_non_image(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let storage = MemoryBlobStorage::new();
        let mut tx = pool.begin().await?;

        // When
        let res = upload_photo(
            &mut tx,
            &storage,
            &user.id,
            b"plain text",
            &Principal::from_user(&user),
        )
        .await;

        // Expect
        assert!(matches!(res, Err(ProfileEditError::Validation(_))));
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        assert!(saved.photo_path.is_none());
        Ok(())
    }

    #[test]
    fn test_check_photo_size() {
        assert!(check_photo_size(MAX_PHOTO_SIZE).is_ok());
        let err = check_photo_size(MAX_PHOTO_SIZE + 1).unwrap_err();
        assert_eq!(err.field_names(), vec!["photo"]);
    }

    #[sqlx::test]
    async fn test_upload_photo_rejects_oversized(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let user = factory.generate_one(&pool, ()).await?;
        let storage = MemoryBlobStorage::new();
        let mut tx = pool.begin().await?;
        let mut bytes = PNG.to_vec();
        bytes.resize(MAX_PHOTO_SIZE + 1, 0);

        // When
        let res = upload_photo(
            &mut tx,
            &storage,
            &user.id,
            &bytes,
            &Principal::from_user(&user),
        )
        .await;

        // Expect
        match res {
            Err(ProfileEditError::Validation(err)) => {
                assert_eq!(err.field_names(), vec!["photo"])
            }
            _ => panic!("expected validation error"),
        }
        let saved = get_user_profile_by_id(&mut tx, &user.id).await?.unwrap();
        assert!(saved.photo_path.is_none());
        Ok(())
    }

    #[sqlx::test]
    async fn test_create_managed_profile(pool: PgPool) -> anyhow::Result<()> {
        // Given
        let mut factory = UserProfileFactory::new();
        let manager = factory.generate_one(&pool, ()).await?;
        let principal = Principal::from_user(&manager);
        let mut tx = pool.begin().await?;

        // When
        let res = create_managed_profile(
            &mut tx,
            NewManagedProfile {
                name: " Anak ".to_string(),
                nickname: Some("".to_string()),
                gender_id: 2,
            },
            &principal,
        )
        .await?;

        // Expect
        let saved = get_user_profile_by_id(&mut tx, &res.id).await?.unwrap();
        assert_eq!(saved.name, Some("Anak".to_string()));
        assert_eq!(saved.nickname, None);
        assert_eq!(saved.manager_id, Some(manager.id));
        assert!(saved.email.is_none());
        assert!(saved.password.is_none());

        let res = create_managed_profile(
            &mut tx,
            NewManagedProfile {
                name: "".to_string(),
                nickname: None,
                gender_id: 9,
            },
            &principal,
        )
        .await;
        match res {
            Err(ProfileEditError::Validation(err)) => {
                assert_eq!(err.field_names(), vec!["gender_id", "name"])
            }
            other => panic!("unexpected result: {:?}", other),
        }
        Ok(())
    }
}
