/// Cost calculation model
///
/// A calculation is a priced estimate attached to a project. Amounts are
/// stored in cents to avoid floating point money.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Calculation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub total_cost_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CALCULATION_COLUMNS: &str = "id, project_id, name, total_cost_cents, currency, status, \
     created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateCalculation {
    pub project_id: Uuid,
    pub name: String,
    pub total_cost_cents: i64,
    pub created_by: Uuid,
}

impl Calculation {
    pub async fn create(pool: &PgPool, data: CreateCalculation) -> Result<Self, sqlx::Error> {
        let calculation = sqlx::query_as::<_, Calculation>(&format!(
            r#"
            INSERT INTO calculations (project_id, name, total_cost_cents, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {CALCULATION_COLUMNS}
            "#,
        ))
        .bind(data.project_id)
        .bind(data.name)
        .bind(data.total_cost_cents)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(calculation)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let calculation = sqlx::query_as::<_, Calculation>(&format!(
            "SELECT {CALCULATION_COLUMNS} FROM calculations WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(calculation)
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let calculations = sqlx::query_as::<_, Calculation>(&format!(
            r#"
            SELECT {CALCULATION_COLUMNS} FROM calculations
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(calculations)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM calculations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
