/// Refresh-token sessions
///
/// One row per issued refresh token. The token value itself is the lookup
/// key; a refresh is only honored while a matching, unexpired row exists,
/// so deleting rows is how logout and revocation work.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Refresh token value (JWT), unique per session
    pub token: String,

    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a session
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub token: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub async fn create(pool: &PgPool, data: CreateSession) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token, user_agent, ip_address, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token, user_agent, ip_address, expires_at, last_used_at, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.token)
        .bind(data.user_agent)
        .bind(data.ip_address)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, user_agent, ip_address, expires_at, last_used_at, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// True if the session is past its expiry
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Records that the session was used for a refresh
    pub async fn touch(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE sessions SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes one session by its token (logout)
    pub async fn delete_by_token(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes all of a user's sessions (logout everywhere)
    pub async fn delete_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "token".to_string(),
            user_agent: None,
            ip_address: None,
            expires_at,
            last_used_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_expired() {
        assert!(session_expiring_at(Utc::now() - Duration::minutes(1)).is_expired());
        assert!(!session_expiring_at(Utc::now() + Duration::days(1)).is_expired());
    }
}
