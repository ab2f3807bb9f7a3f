/// API key model
///
/// Only the SHA-256 hash of a key is stored. The plaintext is shown to the
/// caller exactly once, at creation time. Key generation and verification
/// live in [`crate::auth::api_key`].
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub company_id: Uuid,
    pub created_by: Uuid,
    pub name: String,

    /// SHA-256 hex digest of the full key
    #[serde(skip_serializing)]
    pub key_hash: String,

    /// Granted scopes, e.g. `projects:read` or `projects:*`
    pub scopes: Vec<String>,

    /// Per-key requests-per-minute override for the gateway
    pub rate_limit_per_minute: i32,

    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const API_KEY_COLUMNS: &str = "id, company_id, created_by, name, key_hash, scopes, \
     rate_limit_per_minute, is_active, expires_at, last_used_at, created_at";

#[derive(Debug, Clone)]
pub struct CreateApiKey {
    pub company_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub rate_limit_per_minute: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Usable means active and not past its expiry
    pub fn is_usable(&self) -> bool {
        if !self.is_active {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > Utc::now(),
            None => true,
        }
    }

    pub async fn create(pool: &PgPool, data: CreateApiKey) -> Result<Self, sqlx::Error> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            INSERT INTO api_keys (company_id, created_by, name, key_hash, scopes,
                                  rate_limit_per_minute, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {API_KEY_COLUMNS}
            "#,
        ))
        .bind(data.company_id)
        .bind(data.created_by)
        .bind(data.name)
        .bind(data.key_hash)
        .bind(data.scopes)
        .bind(data.rate_limit_per_minute)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(key)
    }

    /// Looks a key up by the hash of its plaintext
    pub async fn find_by_hash(pool: &PgPool, key_hash: &str) -> Result<Option<Self>, sqlx::Error> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = $1",
        ))
        .bind(key_hash)
        .fetch_optional(pool)
        .await?;

        Ok(key)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let key = sqlx::query_as::<_, ApiKey>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(key)
    }

    pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let keys = sqlx::query_as::<_, ApiKey>(&format!(
            r#"
            SELECT {API_KEY_COLUMNS} FROM api_keys
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(keys)
    }

    pub async fn touch_last_used(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes a key (kept for audit, never deleted)
    pub async fn revoke(pool: &PgPool, id: Uuid, company_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE api_keys SET is_active = FALSE WHERE id = $1 AND company_id = $2",
        )
        .bind(id)
        .bind(company_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn key(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            name: "ci".to_string(),
            key_hash: "hash".to_string(),
            scopes: vec!["projects:read".to_string()],
            rate_limit_per_minute: 60,
            is_active,
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_usable() {
        assert!(key(true, None).is_usable());
        assert!(key(true, Some(Utc::now() + Duration::days(1))).is_usable());
        assert!(!key(false, None).is_usable());
        assert!(!key(true, Some(Utc::now() - Duration::hours(1))).is_usable());
    }
}
