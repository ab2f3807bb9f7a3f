/// Company model and database operations
///
/// A company is the tenant boundary: users, projects, subscriptions and
/// API keys all hang off a company. The subscription plan is stored as
/// text and resolved to a typed [`PlanType`](crate::billing::catalog::PlanType)
/// on read, so an unknown value degrades to the free plan instead of
/// failing row decoding.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::billing::catalog::PlanType;

/// Industry segment of a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyType {
    Contractor,
    Architect,
    Developer,
    Supplier,
    Government,
    Other,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Contractor => "contractor",
            CompanyType::Architect => "architect",
            CompanyType::Developer => "developer",
            CompanyType::Supplier => "supplier",
            CompanyType::Government => "government",
            CompanyType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "contractor" => Some(CompanyType::Contractor),
            "architect" => Some(CompanyType::Architect),
            "developer" => Some(CompanyType::Developer),
            "supplier" => Some(CompanyType::Supplier),
            "government" => Some(CompanyType::Government),
            "other" => Some(CompanyType::Other),
            _ => None,
        }
    }
}

/// Company (tenant) row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,

    /// Industry segment, stored as text
    pub company_type: String,

    /// Dutch chamber of commerce number
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub website: Option<String>,
    pub phone: Option<String>,

    /// Owning user; only null mid-registration, before the owner row exists
    pub owner_id: Option<Uuid>,

    /// Subscription plan, stored as text
    pub plan_type: String,
    pub subscription_status: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COMPANY_COLUMNS: &str = "id, name, company_type, kvk_number, vat_number, address, city, \
     postal_code, country, website, phone, owner_id, plan_type, subscription_status, \
     created_at, updated_at";

/// Input for creating a company
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub name: String,
    pub company_type: CompanyType,
    pub kvk_number: Option<String>,
    pub vat_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

impl Company {
    /// Typed view of the stored plan
    ///
    /// Unknown plan strings fall back to the free plan.
    pub fn plan(&self) -> PlanType {
        PlanType::from_str(&self.plan_type).unwrap_or(PlanType::Free)
    }

    pub fn company_type(&self) -> CompanyType {
        CompanyType::from_str(&self.company_type).unwrap_or(CompanyType::Other)
    }

    /// Inserts a new company without an owner
    ///
    /// The owner is patched in via [`Company::set_owner`] once the owning
    /// user row exists.
    pub async fn create(pool: &PgPool, data: CreateCompany) -> Result<Self, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (name, company_type, kvk_number, vat_number, address, city,
                                   postal_code, country, website, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'Netherlands'), $9, $10)
            RETURNING {COMPANY_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.company_type.as_str())
        .bind(data.kvk_number)
        .bind(data.vat_number)
        .bind(data.address)
        .bind(data.city)
        .bind(data.postal_code)
        .bind(data.country)
        .bind(data.website)
        .bind(data.phone)
        .fetch_one(pool)
        .await?;

        Ok(company)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    pub async fn set_owner(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE companies SET owner_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves the company onto a different plan
    pub async fn set_plan(
        pool: &PgPool,
        id: Uuid,
        plan: PlanType,
        subscription_status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET plan_type = $2, subscription_status = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .bind(subscription_status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a company row
    ///
    /// Used as the compensation step when registration fails after the
    /// company insert but before the user insert succeeds.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts projects that consume plan quota (archived ones do not)
    pub async fn count_active_projects(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM projects WHERE company_id = $1 AND status != 'archived'",
        )
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
    fn test_company_type_round_trip() {
        for ct in [
            CompanyType::Contractor,
            CompanyType::Architect,
            CompanyType::Developer,
            CompanyType::Supplier,
            CompanyType::Government,
            CompanyType::Other,
        ] {
            assert_eq!(CompanyType::from_str(ct.as_str()), Some(ct));
        }
    }

    #[test]
    fn test_unknown_company_type() {
        assert_eq!(CompanyType::from_str("bakery"), None);
    }
}
