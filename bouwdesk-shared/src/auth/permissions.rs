/// Project permission engine
///
/// Every project-scoped action goes through [`evaluate`]: a pure, ordered
/// decision over the actor's global role, tenant, team membership and the
/// project's lifecycle state. The order matters and first match wins:
///
/// 1. Platform admins are allowed everything.
/// 2. Company admins are allowed everything inside their own company;
///    a project from another company is a hard `CrossTenantAccess` denial,
///    never a fall-through.
/// 3. No membership, or an inactive one, denies with `NotATeamMember`.
/// 4. The static role/action matrix decides; a miss denies with
///    `InsufficientTeamRole`.
/// 5. Lifecycle overrides apply even when step 4 granted: archived
///    projects refuse edit and delete outright, completed projects only
///    accept edits from owners and managers.
///
/// The engine is deliberately free of I/O so the full decision table is
/// unit-testable; [`require_project_permission`] is the async wrapper that
/// loads the project and membership rows and runs the same evaluation.
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::project::{Project, ProjectStatus};
use crate::models::team_member::{ProjectRole, TeamMember};
use crate::models::user::GlobalRole;

/// Actions the matrix knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectAction {
    View,
    Edit,
    Delete,
    ManageTeam,
    ManageDocuments,
    ManageTasks,
    ManageCalculations,
    ChangeSettings,
    Archive,
}

impl ProjectAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectAction::View => "view",
            ProjectAction::Edit => "edit",
            ProjectAction::Delete => "delete",
            ProjectAction::ManageTeam => "manage_team",
            ProjectAction::ManageDocuments => "manage_documents",
            ProjectAction::ManageTasks => "manage_tasks",
            ProjectAction::ManageCalculations => "manage_calculations",
            ProjectAction::ChangeSettings => "change_settings",
            ProjectAction::Archive => "archive",
        }
    }

    /// All matrix actions, for exhaustive tests
    pub const ALL: [ProjectAction; 9] = [
        ProjectAction::View,
        ProjectAction::Edit,
        ProjectAction::Delete,
        ProjectAction::ManageTeam,
        ProjectAction::ManageDocuments,
        ProjectAction::ManageTasks,
        ProjectAction::ManageCalculations,
        ProjectAction::ChangeSettings,
        ProjectAction::Archive,
    ];
}

/// Typed denial reasons, each with a stable wire code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionDenied {
    #[error("you are not a member of this project's team")]
    NotATeamMember,

    #[error("your team role does not allow this action")]
    InsufficientTeamRole,

    #[error("this project belongs to another company")]
    CrossTenantAccess,

    #[error("this project is archived and cannot be modified")]
    ProjectArchived,

    #[error("this project is completed; only owners and managers may edit it")]
    ProjectCompleted,
}

impl PermissionDenied {
    /// Stable machine-readable code surfaced in 403 responses
    pub fn code(&self) -> &'static str {
        match self {
            PermissionDenied::NotATeamMember => "not_a_team_member",
            PermissionDenied::InsufficientTeamRole => "insufficient_team_role",
            PermissionDenied::CrossTenantAccess => "cross_tenant_access",
            PermissionDenied::ProjectArchived => "project_archived",
            PermissionDenied::ProjectCompleted => "project_completed",
        }
    }
}

/// The requesting identity, as the engine sees it
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: GlobalRole,
    pub company_id: Option<Uuid>,
}

/// The parts of a project the engine needs
#[derive(Debug, Clone, Copy)]
pub struct ProjectScope {
    pub company_id: Uuid,
    pub status: ProjectStatus,
}

impl From<&Project> for ProjectScope {
    fn from(project: &Project) -> Self {
        Self {
            company_id: project.company_id,
            status: project.status,
        }
    }
}

/// Static role/action grant matrix
fn matrix_grants(role: ProjectRole, action: ProjectAction) -> bool {
    use ProjectAction::*;
    use ProjectRole::*;

    match action {
        View => true,
        Edit => matches!(role, Owner | Manager | Member),
        Delete => matches!(role, Owner),
        ManageTeam => matches!(role, Owner | Manager),
        ManageDocuments => matches!(role, Owner | Manager | Member),
        ManageTasks => matches!(role, Owner | Manager | Member),
        ManageCalculations => matches!(role, Owner | Manager | Member),
        ChangeSettings => matches!(role, Owner | Manager),
        Archive => matches!(role, Owner),
    }
}

/// Decides whether `actor` may perform `action` on the project
///
/// Pure and total: every input combination produces either `Ok(())` or a
/// typed denial.
pub fn evaluate(
    actor: &Actor,
    project: &ProjectScope,
    membership: Option<&TeamMember>,
    action: ProjectAction,
) -> Result<(), PermissionDenied> {
    // 1. Platform admin bypasses everything, including lifecycle locks.
    if actor.role == GlobalRole::Admin {
        return Ok(());
    }

    // 2. Company admin: full access inside their own company only.
    if actor.role == GlobalRole::CompanyAdmin {
        return if actor.company_id == Some(project.company_id) {
            Ok(())
        } else {
            Err(PermissionDenied::CrossTenantAccess)
        };
    }

    // 3. Everyone else needs an active membership.
    let membership = match membership {
        Some(m) if m.is_active => m,
        _ => return Err(PermissionDenied::NotATeamMember),
    };

    // 4. Static matrix.
    if !matrix_grants(membership.role, action) {
        return Err(PermissionDenied::InsufficientTeamRole);
    }

    // 5. Lifecycle overrides trump a matrix grant.
    match project.status {
        ProjectStatus::Archived
            if matches!(action, ProjectAction::Edit | ProjectAction::Delete) =>
        {
            return Err(PermissionDenied::ProjectArchived);
        }
        ProjectStatus::Completed if action == ProjectAction::Edit => {
            if !matches!(membership.role, ProjectRole::Owner | ProjectRole::Manager) {
                return Err(PermissionDenied::ProjectCompleted);
            }
        }
        _ => {}
    }

    Ok(())
}

/// Errors from the I/O-backed permission check
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("project not found")]
    ProjectNotFound,

    #[error(transparent)]
    Denied(#[from] PermissionDenied),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Loads the project and the actor's membership, then evaluates
///
/// Returns the project on success so handlers don't need a second fetch.
pub async fn require_project_permission(
    pool: &PgPool,
    actor: &Actor,
    project_id: Uuid,
    action: ProjectAction,
) -> Result<Project, PermissionError> {
    let project = Project::find_by_id(pool, project_id)
        .await?
        .ok_or(PermissionError::ProjectNotFound)?;

    let membership = TeamMember::find(pool, project_id, actor.user_id).await?;

    evaluate(actor, &ProjectScope::from(&project), membership.as_ref(), action)?;

    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn actor(role: GlobalRole, company_id: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            company_id,
        }
    }

    fn scope(company_id: Uuid, status: ProjectStatus) -> ProjectScope {
        ProjectScope { company_id, status }
    }

    fn membership(role: ProjectRole, is_active: bool) -> TeamMember {
        TeamMember {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            invited_by: Uuid::new_v4(),
            invited_at: Utc::now(),
            joined_at: Some(Utc::now()),
            is_active,
        }
    }

    /// Expected grants per (role, action), exactly the documented matrix
    fn expected_grant(role: ProjectRole, action: ProjectAction) -> bool {
        use ProjectAction::*;
        let row: [bool; 4] = match action {
            View => [true, true, true, true],
            Edit => [true, true, true, false],
            Delete => [true, false, false, false],
            ManageTeam => [true, true, false, false],
            ManageDocuments => [true, true, true, false],
            ManageTasks => [true, true, true, false],
            ManageCalculations => [true, true, true, false],
            ChangeSettings => [true, true, false, false],
            Archive => [true, false, false, false],
        };
        let idx = match role {
            ProjectRole::Owner => 0,
            ProjectRole::Manager => 1,
            ProjectRole::Member => 2,
            ProjectRole::Viewer => 3,
        };
        row[idx]
    }

    #[test]
    fn test_matrix_conformance_for_all_roles_and_actions() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Active);

        for role in [
            ProjectRole::Owner,
            ProjectRole::Manager,
            ProjectRole::Member,
            ProjectRole::Viewer,
        ] {
            let member = membership(role, true);
            for action in ProjectAction::ALL {
                let result = evaluate(
                    &actor(GlobalRole::Viewer, Some(company)),
                    &project,
                    Some(&member),
                    action,
                );
                assert_eq!(
                    result.is_ok(),
                    expected_grant(role, action),
                    "role {:?} action {:?}",
                    role,
                    action
                );
                if result.is_err() {
                    assert_eq!(result.unwrap_err(), PermissionDenied::InsufficientTeamRole);
                }
            }
        }
    }

    #[test]
    fn test_admin_bypasses_everything() {
        let project = scope(Uuid::new_v4(), ProjectStatus::Archived);
        let admin = actor(GlobalRole::Admin, None);

        // No membership, archived project, every action: still allowed.
        for action in ProjectAction::ALL {
            assert!(evaluate(&admin, &project, None, action).is_ok());
        }
    }

    #[test]
    fn test_company_admin_same_company_allowed() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Active);
        let ca = actor(GlobalRole::CompanyAdmin, Some(company));

        for action in ProjectAction::ALL {
            assert!(evaluate(&ca, &project, None, action).is_ok());
        }
    }

    #[test]
    fn test_company_admin_cross_tenant_denied() {
        let project = scope(Uuid::new_v4(), ProjectStatus::Active);
        let ca = actor(GlobalRole::CompanyAdmin, Some(Uuid::new_v4()));

        let result = evaluate(&ca, &project, None, ProjectAction::View);
        assert_eq!(result.unwrap_err(), PermissionDenied::CrossTenantAccess);

        // Also denied when the actor has no company at all.
        let homeless = actor(GlobalRole::CompanyAdmin, None);
        let result = evaluate(&homeless, &project, None, ProjectAction::View);
        assert_eq!(result.unwrap_err(), PermissionDenied::CrossTenantAccess);
    }

    #[test]
    fn test_missing_membership_denied() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Active);
        let user = actor(GlobalRole::ProjectManager, Some(company));

        let result = evaluate(&user, &project, None, ProjectAction::View);
        assert_eq!(result.unwrap_err(), PermissionDenied::NotATeamMember);
    }

    #[test]
    fn test_inactive_membership_denied() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Active);
        let user = actor(GlobalRole::ProjectManager, Some(company));

        // Even an owner-role membership is void when inactive.
        let member = membership(ProjectRole::Owner, false);
        let result = evaluate(&user, &project, Some(&member), ProjectAction::View);
        assert_eq!(result.unwrap_err(), PermissionDenied::NotATeamMember);
    }

    #[test]
    fn test_archived_blocks_edit_and_delete_for_owner() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Archived);
        let user = actor(GlobalRole::Estimator, Some(company));
        let owner = membership(ProjectRole::Owner, true);

        for action in [ProjectAction::Edit, ProjectAction::Delete] {
            let result = evaluate(&user, &project, Some(&owner), action);
            assert_eq!(result.unwrap_err(), PermissionDenied::ProjectArchived);
        }

        // View stays open on archived projects.
        assert!(evaluate(&user, &project, Some(&owner), ProjectAction::View).is_ok());
        let viewer = membership(ProjectRole::Viewer, true);
        assert!(evaluate(&user, &project, Some(&viewer), ProjectAction::View).is_ok());
    }

    #[test]
    fn test_completed_restricts_edit_to_owner_and_manager() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Completed);
        let user = actor(GlobalRole::Estimator, Some(company));

        assert!(evaluate(
            &user,
            &project,
            Some(&membership(ProjectRole::Owner, true)),
            ProjectAction::Edit
        )
        .is_ok());
        assert!(evaluate(
            &user,
            &project,
            Some(&membership(ProjectRole::Manager, true)),
            ProjectAction::Edit
        )
        .is_ok());

        // Member has Edit in the base matrix but loses it here.
        let result = evaluate(
            &user,
            &project,
            Some(&membership(ProjectRole::Member, true)),
            ProjectAction::Edit,
        );
        assert_eq!(result.unwrap_err(), PermissionDenied::ProjectCompleted);

        // Viewer never had Edit; that denial stays InsufficientTeamRole.
        let result = evaluate(
            &user,
            &project,
            Some(&membership(ProjectRole::Viewer, true)),
            ProjectAction::Edit,
        );
        assert_eq!(result.unwrap_err(), PermissionDenied::InsufficientTeamRole);
    }

    #[test]
    fn test_completed_leaves_other_actions_alone() {
        let company = Uuid::new_v4();
        let project = scope(company, ProjectStatus::Completed);
        let user = actor(GlobalRole::Estimator, Some(company));
        let member = membership(ProjectRole::Member, true);

        assert!(evaluate(&user, &project, Some(&member), ProjectAction::View).is_ok());
        assert!(evaluate(&user, &project, Some(&member), ProjectAction::ManageTasks).is_ok());
    }

    #[test]
    fn test_denial_codes_are_stable() {
        assert_eq!(PermissionDenied::NotATeamMember.code(), "not_a_team_member");
        assert_eq!(
            PermissionDenied::InsufficientTeamRole.code(),
            "insufficient_team_role"
        );
        assert_eq!(
            PermissionDenied::CrossTenantAccess.code(),
            "cross_tenant_access"
        );
        assert_eq!(PermissionDenied::ProjectArchived.code(), "project_archived");
        assert_eq!(
            PermissionDenied::ProjectCompleted.code(),
            "project_completed"
        );
    }
}
