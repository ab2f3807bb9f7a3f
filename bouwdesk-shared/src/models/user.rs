/// User model and database operations
///
/// Users belong to at most one company and carry a global role that gates
/// company-wide endpoints. Project-level access is handled separately via
/// team memberships.
///
/// # Example
///
/// ```no_run
/// use bouwdesk_shared::models::user::{User, CreateUser, GlobalRole, UserStatus};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "aannemer@example.nl".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Jan".to_string(),
///     last_name: "de Vries".to_string(),
///     phone: None,
///     role: GlobalRole::Viewer,
///     status: UserStatus::Active,
///     company_id: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "aannemer@example.nl").await?;
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Platform-wide roles, ordered from most to least privileged
///
/// Hierarchy: Admin > CompanyAdmin > ProjectManager > Estimator > Viewer.
/// These gate company-wide endpoints only; project-scoped actions go
/// through the team-role permission engine instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "global_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    /// Platform operator: bypasses all permission checks
    Admin,

    /// Full control within their own company
    CompanyAdmin,

    /// Can run projects they are assigned to
    ProjectManager,

    /// Can work on calculations and documents
    Estimator,

    /// Read-only access
    Viewer,
}

impl GlobalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalRole::Admin => "admin",
            GlobalRole::CompanyAdmin => "company_admin",
            GlobalRole::ProjectManager => "project_manager",
            GlobalRole::Estimator => "estimator",
            GlobalRole::Viewer => "viewer",
        }
    }

    /// Numeric rank for hierarchy comparisons
    pub fn rank(&self) -> u8 {
        match self {
            GlobalRole::Admin => 4,
            GlobalRole::CompanyAdmin => 3,
            GlobalRole::ProjectManager => 2,
            GlobalRole::Estimator => 1,
            GlobalRole::Viewer => 0,
        }
    }

    /// Checks whether this role meets a minimum required role
    ///
    /// Admin always passes, regardless of the minimum asked for.
    pub fn has_at_least(&self, required: GlobalRole) -> bool {
        if matches!(self, GlobalRole::Admin) {
            return true;
        }
        self.rank() >= required.rank()
    }
}

/// Account lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    /// Deactivated account; users are never hard-deleted
    Inactive,
    Suspended,
    /// Awaiting activation (e.g. invited into a company)
    Pending,
}

/// User account row
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Email address, unique case-insensitively
    pub email: String,

    pub email_verified: bool,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,

    pub role: GlobalRole,
    pub status: UserStatus,

    /// Company the user belongs to, if any
    pub company_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, email_verified, password_hash, first_name, last_name, \
     phone, avatar_url, role, status, company_id, created_at, updated_at, last_login_at";

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    /// Argon2id hash, not the plaintext password
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: GlobalRole,
    pub status: UserStatus,
    pub company_id: Option<Uuid>,
}

/// Input for updating an existing user
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub role: Option<GlobalRole>,
    pub status: Option<UserStatus>,
    pub email_verified: Option<bool>,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a unique-constraint violation if the email is already
    /// registered (surfaced to the API as a conflict).
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role, status, company_id)
            VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .bind(data.role)
        .bind(data.status)
        .bind(data.company_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email, case-insensitively
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Builds the SET clause dynamically from the non-None fields;
    /// `updated_at` is always refreshed.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if data.phone.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone = ${}", bind_count));
        }
        if data.avatar_url.is_some() {
            bind_count += 1;
            query.push_str(&format!(", avatar_url = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.email_verified.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email_verified = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(avatar_url) = data.avatar_url {
            q = q.bind(avatar_url);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(verified) = data.email_verified {
            q = q.bind(verified);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Attaches a user to a company
    pub async fn set_company(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET company_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(company_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks an account inactive (soft delete)
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = 'inactive', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users in a company, newest first
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
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

        Ok(users)
    }

    /// Counts active (seat-consuming) users in a company
    pub async fn count_active_by_company(
        pool: &PgPool,
        company_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE company_id = $1 AND status = 'active'",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ranks_are_strictly_ordered() {
        assert!(GlobalRole::Admin.rank() > GlobalRole::CompanyAdmin.rank());
        assert!(GlobalRole::CompanyAdmin.rank() > GlobalRole::ProjectManager.rank());
        assert!(GlobalRole::ProjectManager.rank() > GlobalRole::Estimator.rank());
        assert!(GlobalRole::Estimator.rank() > GlobalRole::Viewer.rank());
    }

    #[test]
    fn test_has_at_least() {
        assert!(GlobalRole::CompanyAdmin.has_at_least(GlobalRole::ProjectManager));
        assert!(GlobalRole::ProjectManager.has_at_least(GlobalRole::ProjectManager));
        assert!(!GlobalRole::Estimator.has_at_least(GlobalRole::ProjectManager));
        assert!(!GlobalRole::Viewer.has_at_least(GlobalRole::Estimator));
    }

    #[test]
    fn test_admin_short_circuit() {
        // Admin passes any minimum, including itself
        assert!(GlobalRole::Admin.has_at_least(GlobalRole::Admin));
        assert!(GlobalRole::Admin.has_at_least(GlobalRole::CompanyAdmin));
        assert!(GlobalRole::Admin.has_at_least(GlobalRole::Viewer));
    }

    #[test]
    fn test_role_serde_round_trip() {
        let json = serde_json::to_string(&GlobalRole::CompanyAdmin).unwrap();
        assert_eq!(json, "\"company_admin\"");
        let role: GlobalRole = serde_json::from_str("\"project_manager\"").unwrap();
        assert_eq!(role, GlobalRole::ProjectManager);
    }

    #[test]
    fn test_unknown_role_string_rejected() {
        let result: Result<GlobalRole, _> = serde_json::from_str("\"superuser\"");
        assert!(result.is_err());
    }

    // Database operations are covered by integration tests in tests/
}
