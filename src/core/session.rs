use redis::ConnectionLike;
use serde::{Deserialize, Serialize};

use crate::{model::user_profile::UserProfile, settings::Config};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub refresh_token: String,
}

pub fn add_session<C: ConnectionLike>(
    redis_conn: &mut C,
    user: &UserProfile,
    config: &Config,
    token: String,
    refresh_token: String,
) -> anyhow::Result<()> {
    let session_data = SessionData {
        user_id: user.id.to_string(),
        refresh_token,
    };
    let session_json = serde_json::to_string(&session_data)?;
    // jwt_exp is in minutes
    redis::Cmd::set_ex(token, session_json, config.jwt_exp as u64 * 60).exec(redis_conn)?;
    Ok(())
}

pub fn get_session<C: ConnectionLike>(
    redis_conn: &mut C,
    token: String,
) -> anyhow::Result<Option<SessionData>> {
    let res: Option<String> = redis::cmd("GET").arg(token).query(redis_conn)?;
    let Some(res) = res else {
        return Ok(None);
    };
    let session_data: SessionData = serde_json::from_str(res.as_str())?;
    Ok(Some(session_data))
}

pub fn remove_session<C: ConnectionLike>(
    redis_conn: &mut C,
    token: String,
) -> anyhow::Result<bool> {
    let res: Option<String> = redis::cmd("GET").arg(&token).query(redis_conn)?;
    let Some(res) = res else {
        return Ok(false);
    };
    let session_data: SessionData = serde_json::from_str(res.as_str())?;
    redis::cmd("DEL")
        .arg(session_data.refresh_token)
        .exec(redis_conn)?;
    redis::cmd("DEL").arg(token).exec(redis_conn)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use uuid::Uuid;

    use crate::{
        core::session::{add_session, get_session, remove_session},
        model::user_profile::UserProfile,
        settings::get_config,
    };

    #[test]
    fn test_add_get_remove_session() -> anyhow::Result<()> {
        // Given
        let config = get_config();
        let client = redis::Client::open(config.redis_url.clone())?;
        let mut redis_conn = client.get_connection()?;
        let user = UserProfile::new(Uuid::now_v7(), Local::now().fixed_offset());
        let token = Uuid::now_v7().to_string();

        // When
        add_session(
            &mut redis_conn,
            &user,
            &config,
            token.clone(),
            "refresh".to_string(),
        )?;

        // Expect
        let session = get_session(&mut redis_conn, token.clone())?;
        assert!(session.is_some());
        let session = session.unwrap();
        assert_eq!(session.user_id, user.id.to_string());
        assert_eq!(session.refresh_token, "refresh".to_string());
        assert!(remove_session(&mut redis_conn, token.clone())?);
        assert!(get_session(&mut redis_conn, token.clone())?.is_none());
        assert!(!remove_session(&mut redis_conn, token)?);
        Ok(())
    }
}
