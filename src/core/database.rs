//! Persistence layer for API keys and cost records.
//!
//! PostgreSQL only. Schema migrations are managed externally; this module
//! assumes the `api_keys` and `cost_records` tables exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// An `api_keys` row. The plaintext credential is never stored; `key_hash`
/// is a bcrypt digest.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key_hash: String,
    pub name: Option<String>,
    pub rate_limit_per_minute: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted `cost_records` row.
#[derive(Debug, Clone, FromRow)]
pub struct CostRecordRow {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub request_id: String,
    pub provider: String,
    pub model: String,
    pub tokens_in: i32,
    pub tokens_out: i32,
    pub cost_usd: Decimal,
    pub latency_ms: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting one cost record.
#[derive(Debug, Clone)]
pub struct NewCostRecord {
    pub api_key_id: Uuid,
    pub request_id: String,
    pub provider: String,
    pub model: String,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub cost_usd: Decimal,
    pub latency_ms: i64,
}

/// Optional filters shared by the aggregation queries.
#[derive(Debug, Clone, Default)]
pub struct CostFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Whole-range totals over matching cost records.
#[derive(Debug, Clone, FromRow)]
pub struct CostTotalsRow {
    pub total_cost_usd: Option<Decimal>,
    pub request_count: i64,
    pub total_tokens_in: Option<i64>,
    pub total_tokens_out: Option<i64>,
}

/// One aggregation bucket (per provider or per model).
#[derive(Debug, Clone, FromRow)]
pub struct CostAggregateRow {
    pub group_key: String,
    pub total_cost_usd: Option<Decimal>,
    pub request_count: i64,
    pub total_tokens_in: Option<i64>,
    pub total_tokens_out: Option<i64>,
    pub avg_latency_ms: Option<f64>,
}

const FILTER_CLAUSE: &str = "api_key_id = $1 \
     AND ($2::timestamptz IS NULL OR created_at >= $2) \
     AND ($3::timestamptz IS NULL OR created_at <= $3) \
     AND ($4::text IS NULL OR provider = $4) \
     AND ($5::text IS NULL OR model = $5)";

/// Read access to API key records, behind a trait so the authenticator can
/// be exercised without a live database.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn list_active_keys(&self) -> Result<Vec<ApiKeyRecord>, sqlx::Error>;
    async fn find_key(&self, id: Uuid) -> Result<Option<ApiKeyRecord>, sqlx::Error>;
}

/// Database connection manager.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with a bounded pool. Acquisition blocks at most 5 seconds so
    /// a saturated pool cannot cascade into request latency.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert one cost record.
    pub async fn insert_cost_record(&self, record: &NewCostRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cost_records
                (id, api_key_id, request_id, provider, model,
                 tokens_in, tokens_out, cost_usd, latency_ms, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.api_key_id)
        .bind(&record.request_id)
        .bind(&record.provider)
        .bind(&record.model)
        .bind(record.tokens_in as i32)
        .bind(record.tokens_out as i32)
        .bind(record.cost_usd)
        .bind(record.latency_ms as i32)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Totals over the records matching `filter` for one key.
    pub async fn cost_totals(
        &self,
        api_key_id: Uuid,
        filter: &CostFilter,
    ) -> Result<CostTotalsRow, sqlx::Error> {
        let sql = format!(
            "SELECT SUM(cost_usd) AS total_cost_usd, \
                    COUNT(*) AS request_count, \
                    SUM(tokens_in)::int8 AS total_tokens_in, \
                    SUM(tokens_out)::int8 AS total_tokens_out \
             FROM cost_records WHERE {FILTER_CLAUSE}"
        );
        sqlx::query_as::<_, CostTotalsRow>(&sql)
            .bind(api_key_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.provider.as_deref())
            .bind(filter.model.as_deref())
            .fetch_one(&self.pool)
            .await
    }

    /// Per-provider or per-model aggregates for one key.
    ///
    /// `group_column` must be one of the fixed column names below; it is
    /// interpolated, never caller-supplied.
    pub async fn cost_aggregates(
        &self,
        api_key_id: Uuid,
        filter: &CostFilter,
        group_column: AggregateColumn,
    ) -> Result<Vec<CostAggregateRow>, sqlx::Error> {
        let column = group_column.as_str();
        let sql = format!(
            "SELECT {column} AS group_key, \
                    SUM(cost_usd) AS total_cost_usd, \
                    COUNT(*) AS request_count, \
                    SUM(tokens_in)::int8 AS total_tokens_in, \
                    SUM(tokens_out)::int8 AS total_tokens_out, \
                    AVG(latency_ms)::float8 AS avg_latency_ms \
             FROM cost_records WHERE {FILTER_CLAUSE} \
             GROUP BY {column} ORDER BY SUM(cost_usd) DESC"
        );
        sqlx::query_as::<_, CostAggregateRow>(&sql)
            .bind(api_key_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.provider.as_deref())
            .bind(filter.model.as_deref())
            .fetch_all(&self.pool)
            .await
    }

    /// Paginated cost rows for one key, newest first.
    pub async fn list_cost_records(
        &self,
        api_key_id: Uuid,
        filter: &CostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CostRecordRow>, sqlx::Error> {
        let sql = format!(
            "SELECT id, api_key_id, request_id, provider, model, \
                    tokens_in, tokens_out, cost_usd, latency_ms, created_at \
             FROM cost_records WHERE {FILTER_CLAUSE} \
             ORDER BY created_at DESC LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, CostRecordRow>(&sql)
            .bind(api_key_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.provider.as_deref())
            .bind(filter.model.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    /// Total number of cost rows for one key.
    pub async fn count_cost_records(&self, api_key_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cost_records WHERE api_key_id = $1")
            .bind(api_key_id)
            .fetch_one(&self.pool)
            .await
    }
}

/// Columns the aggregation endpoints may group by.
#[derive(Debug, Clone, Copy)]
pub enum AggregateColumn {
    Provider,
    Model,
}

impl AggregateColumn {
    fn as_str(self) -> &'static str {
        match self {
            AggregateColumn::Provider => "provider",
            AggregateColumn::Model => "model",
        }
    }
}

#[async_trait]
impl ApiKeyStore for Database {
    async fn list_active_keys(&self) -> Result<Vec<ApiKeyRecord>, sqlx::Error> {
        sqlx::query_as::<_, ApiKeyRecord>(
            r#"
            SELECT id, key_hash, name, rate_limit_per_minute, is_active, created_at
            FROM api_keys
            WHERE is_active = true
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_key(&self, id: Uuid) -> Result<Option<ApiKeyRecord>, sqlx::Error> {
        sqlx::query_as::<_, ApiKeyRecord>(
            r#"
            SELECT id, key_hash, name, rate_limit_per_minute, is_active, created_at
            FROM api_keys
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_column_names() {
        assert_eq!(AggregateColumn::Provider.as_str(), "provider");
        assert_eq!(AggregateColumn::Model.as_str(), "model");
    }

    #[test]
    fn test_filter_clause_binds_every_filter_field() {
        // The clause is shared by three queries; each optional filter must
        // appear with its typed NULL guard.
        for fragment in [
            "$2::timestamptz IS NULL OR created_at >= $2",
            "$3::timestamptz IS NULL OR created_at <= $3",
            "$4::text IS NULL OR provider = $4",
            "$5::text IS NULL OR model = $5",
        ] {
            assert!(FILTER_CLAUSE.contains(fragment));
        }
    }
}
