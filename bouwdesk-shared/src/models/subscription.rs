/// Subscription model
///
/// The local subscription row is the source of truth for what a company is
/// entitled to. Payment processor identifiers are kept alongside so the
/// webhook handler can correlate processor events back to a row.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::billing::catalog::PlanType;

/// Processor-aligned subscription states, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "trialing" => Some(SubscriptionStatus::Trialing),
            "incomplete" => Some(SubscriptionStatus::Incomplete),
            _ => None,
        }
    }
}

/// Billing interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub company_id: Uuid,
    pub created_by: Uuid,
    pub plan_type: String,
    pub status: String,
    pub interval: String,
    pub amount_cents: i64,
    pub currency: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub processor_customer_id: Option<String>,
    pub processor_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SUBSCRIPTION_COLUMNS: &str = "id, company_id, created_by, plan_type, status, interval, \
     amount_cents, currency, current_period_start, current_period_end, \
     processor_customer_id, processor_subscription_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub company_id: Uuid,
    pub created_by: Uuid,
    pub plan_type: PlanType,
    pub interval: BillingInterval,
    pub amount_cents: i64,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub processor_customer_id: Option<String>,
    pub processor_subscription_id: Option<String>,
}

impl Subscription {
    pub fn plan(&self) -> PlanType {
        PlanType::from_str(&self.plan_type).unwrap_or(PlanType::Free)
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status).unwrap_or(SubscriptionStatus::Incomplete)
    }

    pub async fn create(pool: &PgPool, data: CreateSubscription) -> Result<Self, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (company_id, created_by, plan_type, interval, amount_cents,
                                       current_period_start, current_period_end,
                                       processor_customer_id, processor_subscription_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(data.company_id)
        .bind(data.created_by)
        .bind(data.plan_type.as_str())
        .bind(data.interval.as_str())
        .bind(data.amount_cents)
        .bind(data.current_period_start)
        .bind(data.current_period_end)
        .bind(data.processor_customer_id)
        .bind(data.processor_subscription_id)
        .fetch_one(pool)
        .await?;

        Ok(subscription)
    }

    /// Most recent non-canceled subscription for a company, if any
    pub async fn find_current_for_company(
        pool: &PgPool,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE company_id = $1 AND status != 'canceled'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(company_id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    pub async fn find_by_processor_id(
        pool: &PgPool,
        processor_subscription_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE processor_subscription_id = $1",
        ))
        .bind(processor_subscription_id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Rolls the billing period forward after a successful renewal
    pub async fn set_period(
        pool: &PgPool,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET current_period_start = $2, current_period_end = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(start)
        .bind(end)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Incomplete,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), Some(status));
        }
    }
}
