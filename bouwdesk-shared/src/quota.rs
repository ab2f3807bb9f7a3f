/// Plan-based quota enforcement
///
/// Quotas come from the company's plan and are checked against live
/// counts before a resource is created:
/// - projects per company
/// - active users (seats) per company
/// - documents per project
///
/// # Example
///
/// ```no_run
/// use bouwdesk_shared::quota::{QuotaEnforcer, QuotaType};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, company_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let enforcer = QuotaEnforcer::new(pool);
///
/// // Errors with LimitExceeded when the company is at its project cap
/// enforcer.enforce(company_id, QuotaType::Projects).await?;
/// # Ok(())
/// # }
/// ```
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::billing::catalog::PlanLimits;
use crate::models::company::Company;
use crate::models::project::Project;
use crate::models::user::User;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("{} limit exceeded ({current}/{limit})", quota_type.as_str())]
    LimitExceeded {
        quota_type: QuotaType,
        limit: u32,
        current: u32,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("company not found: {0}")]
    CompanyNotFound(Uuid),
}

/// Resource being counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaType {
    /// Non-archived projects in the company
    Projects,

    /// Active user accounts in the company
    Seats,

    /// Documents attached to a single project
    DocumentsPerProject,
}

impl QuotaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaType::Projects => "Project",
            QuotaType::Seats => "Seat",
            QuotaType::DocumentsPerProject => "Documents per project",
        }
    }
}

/// Result of a quota check
#[derive(Debug, Clone, Serialize)]
pub struct QuotaCheckResult {
    pub allowed: bool,
    pub current: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl QuotaCheckResult {
    pub fn allowed(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: true,
            current,
            limit,
            remaining: limit.saturating_sub(current),
        }
    }

    pub fn exceeded(current: u32, limit: u32) -> Self {
        QuotaCheckResult {
            allowed: false,
            current,
            limit,
            remaining: 0,
        }
    }
}

/// Checks live usage against the company's plan limits
pub struct QuotaEnforcer {
    db: PgPool,
}

impl QuotaEnforcer {
    pub fn new(db: PgPool) -> Self {
        QuotaEnforcer { db }
    }

    /// Checks one quota for a company
    ///
    /// For [`QuotaType::DocumentsPerProject`] the project whose documents
    /// are being counted must be passed as `project_id`.
    pub async fn check(
        &self,
        company_id: Uuid,
        quota_type: QuotaType,
        project_id: Option<Uuid>,
    ) -> Result<QuotaCheckResult, QuotaError> {
        let company = Company::find_by_id(&self.db, company_id)
            .await?
            .ok_or(QuotaError::CompanyNotFound(company_id))?;

        let limits = PlanLimits::for_plan(company.plan());
        let limit = match quota_type {
            QuotaType::Projects => limits.max_projects,
            QuotaType::Seats => limits.max_users,
            QuotaType::DocumentsPerProject => limits.max_documents_per_project,
        };

        let current = match quota_type {
            QuotaType::Projects => {
                Company::count_active_projects(&self.db, company_id).await? as u32
            }
            QuotaType::Seats => User::count_active_by_company(&self.db, company_id).await? as u32,
            QuotaType::DocumentsPerProject => match project_id {
                Some(project_id) => Project::count_documents(&self.db, project_id).await? as u32,
                None => 0,
            },
        };

        if current >= limit {
            Ok(QuotaCheckResult::exceeded(current, limit))
        } else {
            Ok(QuotaCheckResult::allowed(current, limit))
        }
    }

    /// Like [`check`](Self::check) but errors when the limit is reached
    pub async fn enforce(&self, company_id: Uuid, quota_type: QuotaType) -> Result<(), QuotaError> {
        self.enforce_for_project(company_id, quota_type, None).await
    }

    pub async fn enforce_for_project(
        &self,
        company_id: Uuid,
        quota_type: QuotaType,
        project_id: Option<Uuid>,
    ) -> Result<(), QuotaError> {
        let result = self.check(company_id, quota_type, project_id).await?;

        if !result.allowed {
            return Err(QuotaError::LimitExceeded {
                quota_type,
                limit: result.limit,
                current: result.current,
            });
        }

        Ok(())
    }

    /// The company's plan limits, for usage reporting
    pub async fn get_limits(&self, company_id: Uuid) -> Result<PlanLimits, QuotaError> {
        let company = Company::find_by_id(&self.db, company_id)
            .await?
            .ok_or(QuotaError::CompanyNotFound(company_id))?;

        Ok(PlanLimits::for_plan(company.plan()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_allowed() {
        let result = QuotaCheckResult::allowed(2, 3);
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn test_check_result_exceeded() {
        let result = QuotaCheckResult::exceeded(3, 3);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_quota_error_display() {
        let err = QuotaError::LimitExceeded {
            quota_type: QuotaType::Projects,
            limit: 3,
            current: 3,
        };
        assert_eq!(err.to_string(), "Project limit exceeded (3/3)");
    }

    // Count queries are exercised in tests/ against a live database
}
