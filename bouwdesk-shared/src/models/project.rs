/// Project model and database operations
///
/// Projects belong to a company and carry a lifecycle status that the
/// permission engine consults: archived projects are frozen, completed
/// projects only accept edits from the project owner or managers.
///
/// The denormalized counters (documents, tasks, team members,
/// calculations) are maintained with atomic `SET n = n + 1` updates so
/// concurrent writers cannot lose increments.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Active,
    OnHold,
    /// Finished work; edits restricted to owner and managers
    Completed,
    /// Frozen; no edits or deletes for anyone
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

/// Denormalized per-project counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectCounter {
    Documents,
    Tasks,
    TeamMembers,
    Calculations,
}

impl ProjectCounter {
    fn column(&self) -> &'static str {
        match self {
            ProjectCounter::Documents => "document_count",
            ProjectCounter::Tasks => "task_count",
            ProjectCounter::TeamMembers => "team_member_count",
            ProjectCounter::Calculations => "calculation_count",
        }
    }
}

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,

    pub address: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_cents: Option<i64>,

    pub created_by: Uuid,

    pub document_count: i32,
    pub task_count: i32,
    pub team_member_count: i32,
    pub calculation_count: i32,

    pub archived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PROJECT_COLUMNS: &str = "id, company_id, name, description, status, address, city, \
     start_date, end_date, budget_cents, created_by, document_count, task_count, \
     team_member_count, calculation_count, archived_at, completed_at, created_at, updated_at";

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_cents: Option<i64>,
    pub created_by: Uuid,
}

/// Input for updating a project; only non-None fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub budget_cents: Option<Option<i64>>,
    pub status: Option<ProjectStatus>,
}

impl Project {
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (company_id, name, description, address, city,
                                  start_date, end_date, budget_cents, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(data.company_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.address)
        .bind(data.city)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.budget_cents)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists a company's projects, newest first
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS} FROM projects
            WHERE company_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(company_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.address.is_some() {
            bind_count += 1;
            query.push_str(&format!(", address = ${}", bind_count));
        }
        if data.city.is_some() {
            bind_count += 1;
            query.push_str(&format!(", city = ${}", bind_count));
        }
        if data.start_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_date = ${}", bind_count));
        }
        if data.end_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_date = ${}", bind_count));
        }
        if data.budget_cents.is_some() {
            bind_count += 1;
            query.push_str(&format!(", budget_cents = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {PROJECT_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(city) = data.city {
            q = q.bind(city);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            q = q.bind(end_date);
        }
        if let Some(budget_cents) = data.budget_cents {
            q = q.bind(budget_cents);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let project = q.fetch_optional(pool).await?;

        Ok(project)
    }

    /// Moves the project into the archived state
    pub async fn archive(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET status = 'archived', archived_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Marks the project completed
    pub async fn complete(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically bumps a denormalized counter
    ///
    /// `delta` may be negative; the counter is clamped at zero.
    pub async fn adjust_counter(
        pool: &PgPool,
        id: Uuid,
        counter: ProjectCounter,
        delta: i32,
    ) -> Result<bool, sqlx::Error> {
        let column = counter.column();
        let result = sqlx::query(&format!(
            "UPDATE projects SET {column} = GREATEST({column} + $2, 0), updated_at = NOW() WHERE id = $1",
        ))
        .bind(id)
        .bind(delta)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts documents attached to this project (quota check input)
    pub async fn count_documents(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM documents WHERE project_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(ProjectStatus::Draft.as_str(), "draft");
        assert_eq!(ProjectStatus::OnHold.as_str(), "on_hold");
        assert_eq!(ProjectStatus::Archived.as_str(), "archived");
    }

    #[test]
    fn test_counter_columns() {
        assert_eq!(ProjectCounter::Documents.column(), "document_count");
        assert_eq!(ProjectCounter::TeamMembers.column(), "team_member_count");
    }

    #[test]
    fn test_status_serde() {
        let status: ProjectStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, ProjectStatus::OnHold);
    }
}
