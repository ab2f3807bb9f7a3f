/// Request logging and usage analytics
///
/// The gateway middleware records every API request as a
/// [`RequestLog`](crate::models::request_log::RequestLog) row; the usage
/// endpoint aggregates those rows into per-company metrics for a period.
/// Logging must never break request handling, so write failures are
/// logged and swallowed.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::request_log::{CreateRequestLog, RequestLog};

/// Reporting window for usage metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl MetricsPeriod {
    pub fn duration(&self) -> Duration {
        match self {
            MetricsPeriod::Hour => Duration::hours(1),
            MetricsPeriod::Day => Duration::days(1),
            MetricsPeriod::Week => Duration::weeks(1),
            MetricsPeriod::Month => Duration::days(30),
        }
    }

    /// Parses the `period` query parameter; anything unknown means a day
    pub fn from_param(s: &str) -> Self {
        match s {
            "hour" => MetricsPeriod::Hour,
            "week" => MetricsPeriod::Week,
            "month" => MetricsPeriod::Month,
            _ => MetricsPeriod::Day,
        }
    }
}

/// Aggregated usage for a company over a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub period: MetricsPeriod,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub average_response_time_ms: f64,
}

/// Writes request log rows without ever failing the request
pub struct RequestLogger {
    db: PgPool,
}

impl RequestLogger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Records one request; failures are logged and dropped
    pub async fn log_request(&self, data: CreateRequestLog) {
        if let Err(e) = RequestLog::create(&self.db, data).await {
            tracing::warn!(error = %e, "failed to write request log");
        }
    }
}

/// Aggregates request logs into usage metrics
pub struct AnalyticsService {
    db: PgPool,
}

impl AnalyticsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Usage metrics for a company over the given period
    ///
    /// Success means a 2xx or 3xx response status.
    pub async fn company_metrics(
        &self,
        company_id: Uuid,
        period: MetricsPeriod,
    ) -> Result<UsageMetrics, sqlx::Error> {
        let end_time = Utc::now();
        let start_time = end_time - period.duration();

        let row: (i64, i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE response_status < 400),
                AVG(processing_time_ms)
            FROM request_logs
            WHERE company_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(company_id)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.db)
        .await?;

        let (total, successful, avg_ms) = row;

        Ok(UsageMetrics {
            period,
            start_time,
            end_time,
            total_requests: total,
            successful_requests: successful,
            failed_requests: total - successful,
            average_response_time_ms: avg_ms.unwrap_or(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_durations() {
        assert_eq!(MetricsPeriod::Hour.duration(), Duration::hours(1));
        assert_eq!(MetricsPeriod::Day.duration(), Duration::days(1));
        assert_eq!(MetricsPeriod::Week.duration(), Duration::weeks(1));
        assert_eq!(MetricsPeriod::Month.duration(), Duration::days(30));
    }

    #[test]
    fn test_period_from_param() {
        assert_eq!(MetricsPeriod::from_param("hour"), MetricsPeriod::Hour);
        assert_eq!(MetricsPeriod::from_param("week"), MetricsPeriod::Week);
        assert_eq!(MetricsPeriod::from_param("day"), MetricsPeriod::Day);
        // Unknown values fall back to a day
        assert_eq!(MetricsPeriod::from_param("fortnight"), MetricsPeriod::Day);
    }

    // Aggregation queries are exercised in tests/ against a live database
}
