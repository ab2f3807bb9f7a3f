/// Gateway request log rows, written by the analytics middleware
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestLog {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub response_status: i32,
    pub processing_time_ms: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording one request
#[derive(Debug, Clone)]
pub struct CreateRequestLog {
    pub method: String,
    pub path: String,
    pub user_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub response_status: i32,
    pub processing_time_ms: i64,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RequestLog {
    pub async fn create(pool: &PgPool, data: CreateRequestLog) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (method, path, user_id, company_id, response_status,
                                      processing_time_ms, user_agent, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(data.method)
        .bind(data.path)
        .bind(data.user_id)
        .bind(data.company_id)
        .bind(data.response_status)
        .bind(data.processing_time_ms)
        .bind(data.user_agent)
        .bind(data.ip_address)
        .execute(pool)
        .await?;

        Ok(())
    }
}
