/// Project team membership store
///
/// Team members link users to projects with a project-scoped role. The
/// project role is a separate axis from the user's global role: a global
/// viewer can still own a project they were invited to run.
///
/// Removal protects the last active owner so a project can never be left
/// without anyone who can administer it.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

/// Roles within a single project
///
/// Hierarchy: Owner > Manager > Member > Viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    /// Full control of the project, including deleting it
    Owner,

    /// Runs the project day to day, manages the team
    Manager,

    /// Works on tasks, documents and calculations
    Member,

    /// Read-only access
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Manager => "manager",
            ProjectRole::Member => "member",
            ProjectRole::Viewer => "viewer",
        }
    }

    /// Numeric rank used by the invite rule
    pub fn rank(&self) -> u8 {
        match self {
            ProjectRole::Owner => 4,
            ProjectRole::Manager => 3,
            ProjectRole::Member => 2,
            ProjectRole::Viewer => 1,
        }
    }

    /// Whether a member with this role may grant `invitee_role` to someone
    ///
    /// Inviters can only hand out roles at or below their own rank. This
    /// check is separate from the manage-team grant; adding a member
    /// requires both.
    pub fn can_invite(&self, invitee_role: ProjectRole) -> bool {
        self.rank() >= invitee_role.rank()
    }
}

/// Errors from membership mutations
#[derive(Debug, Error)]
pub enum TeamMemberError {
    /// Refusing to remove or deactivate the only active owner
    #[error("cannot remove the last active owner of a project")]
    LastOwner,

    #[error("team member not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Team membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,

    pub invited_by: Uuid,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,

    /// Inactive memberships are treated as absent by the permission engine
    pub is_active: bool,
}

const MEMBER_COLUMNS: &str =
    "id, project_id, user_id, role, invited_by, invited_at, joined_at, is_active";

/// Input for adding a team member
#[derive(Debug, Clone)]
pub struct CreateTeamMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub invited_by: Uuid,
}

impl TeamMember {
    /// Adds a user to a project team
    ///
    /// # Errors
    ///
    /// Returns a unique-constraint violation if the user is already on the
    /// team.
    pub async fn add(pool: &PgPool, data: CreateTeamMember) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(&format!(
            r#"
            INSERT INTO team_members (project_id, user_id, role, invited_by, joined_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {MEMBER_COLUMNS}
            "#,
        ))
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .bind(data.invited_by)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }

    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE project_id = $1 AND user_id = $2",
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Lists active members of a project, owners first
    pub async fn list_active(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let members = sqlx::query_as::<_, TeamMember>(&format!(
            r#"
            SELECT {MEMBER_COLUMNS} FROM team_members
            WHERE project_id = $1 AND is_active = TRUE
            ORDER BY role ASC, invited_at ASC
            "#,
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn count_active_owners(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM team_members
            WHERE project_id = $1 AND role = 'owner' AND is_active = TRUE
            "#,
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    pub async fn update_role(
        pool: &PgPool,
        id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, TeamMember>(&format!(
            "UPDATE team_members SET role = $2 WHERE id = $1 RETURNING {MEMBER_COLUMNS}",
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(member)
    }

    /// Removes a member from the team
    ///
    /// # Errors
    ///
    /// Returns [`TeamMemberError::LastOwner`] when the member is the only
    /// remaining active owner of the project.
    pub async fn remove(pool: &PgPool, id: Uuid) -> Result<(), TeamMemberError> {
        let member = Self::find_by_id(pool, id)
            .await?
            .ok_or(TeamMemberError::NotFound)?;

        if member.role == ProjectRole::Owner && member.is_active {
            let owners = Self::count_active_owners(pool, member.project_id).await?;
            if owners <= 1 {
                return Err(TeamMemberError::LastOwner);
            }
        }

        sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Soft-disables a membership; same last-owner guard as removal
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<(), TeamMemberError> {
        let member = Self::find_by_id(pool, id)
            .await?
            .ok_or(TeamMemberError::NotFound)?;

        if member.role == ProjectRole::Owner && member.is_active {
            let owners = Self::count_active_owners(pool, member.project_id).await?;
            if owners <= 1 {
                return Err(TeamMemberError::LastOwner);
            }
        }

        sqlx::query("UPDATE team_members SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ranks() {
        assert!(ProjectRole::Owner.rank() > ProjectRole::Manager.rank());
        assert!(ProjectRole::Manager.rank() > ProjectRole::Member.rank());
        assert!(ProjectRole::Member.rank() > ProjectRole::Viewer.rank());
    }

    #[test]
    fn test_can_invite_at_or_below_own_rank() {
        assert!(ProjectRole::Owner.can_invite(ProjectRole::Owner));
        assert!(ProjectRole::Owner.can_invite(ProjectRole::Manager));
        assert!(ProjectRole::Manager.can_invite(ProjectRole::Manager));
        assert!(ProjectRole::Manager.can_invite(ProjectRole::Viewer));
        assert!(ProjectRole::Viewer.can_invite(ProjectRole::Viewer));

        // Granting above your own rank is refused
        assert!(!ProjectRole::Manager.can_invite(ProjectRole::Owner));
        assert!(!ProjectRole::Member.can_invite(ProjectRole::Manager));
        assert!(!ProjectRole::Viewer.can_invite(ProjectRole::Member));
    }

    // Last-owner guard is exercised in tests/ against a live database;
    // the counting rule itself is trivial SQL.
}
