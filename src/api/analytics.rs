//! Read-only cost analytics endpoints.
//!
//! These are aggregation queries over persisted cost rows, scoped to the
//! authenticated key.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::core::database::{AggregateColumn, CostAggregateRow, CostFilter, CostRecordRow};
use crate::core::error::{GatewayError, Result};
use crate::providers::ProviderKind;

/// Filter parameters shared by the cost endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CostQueryParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl CostQueryParams {
    fn filter(&self) -> CostFilter {
        CostFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            provider: self.provider.clone(),
            model: self.model.clone(),
        }
    }
}

/// One aggregation bucket.
#[derive(Debug, Clone, Serialize)]
pub struct CostAggregate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub total_cost_usd: f64,
    pub request_count: i64,
    pub total_tokens_in: i64,
    pub total_tokens_out: i64,
    pub total_tokens: i64,
    pub avg_latency_ms: f64,
}

/// `GET /v1/costs` response.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummaryResponse {
    pub total_cost_usd: f64,
    pub total_requests: i64,
    pub total_tokens_in: i64,
    pub total_tokens_out: i64,
    pub total_tokens: i64,
    pub by_provider: Vec<CostAggregate>,
    pub by_model: Vec<CostAggregate>,
}

/// One row of `GET /v1/costs/records`.
#[derive(Debug, Clone, Serialize)]
pub struct CostRecordDetail {
    pub id: String,
    pub request_id: String,
    pub provider: String,
    pub model: String,
    pub tokens_in: i32,
    pub tokens_out: i32,
    pub total_tokens: i64,
    pub cost_usd: f64,
    pub latency_ms: i32,
    pub created_at: DateTime<Utc>,
}

/// One row of `GET /v1/transactions/recent`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub tokens: i64,
    pub cost_usd: f64,
    pub latency_ms: i32,
}

/// `GET /v1/transactions/recent` response.
#[derive(Debug, Clone, Serialize)]
pub struct RecentTransactionsResponse {
    pub transactions: Vec<TransactionRecord>,
    pub total: i64,
}

/// Static provider catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub models: Vec<&'static str>,
    pub pricing_note: &'static str,
}

/// Cost summary with per-provider and per-model aggregates.
pub async fn cost_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CostQueryParams>,
) -> Result<Json<CostSummaryResponse>> {
    let api_key = state.authenticator.authenticate(&headers).await?;
    let filter = params.filter();

    let totals = state
        .db
        .cost_totals(api_key.id, &filter)
        .await
        .map_err(internal)?;
    let by_provider = state
        .db
        .cost_aggregates(api_key.id, &filter, AggregateColumn::Provider)
        .await
        .map_err(internal)?;
    let by_model = state
        .db
        .cost_aggregates(api_key.id, &filter, AggregateColumn::Model)
        .await
        .map_err(internal)?;

    let total_tokens_in = totals.total_tokens_in.unwrap_or(0);
    let total_tokens_out = totals.total_tokens_out.unwrap_or(0);
    Ok(Json(CostSummaryResponse {
        total_cost_usd: decimal_to_f64(totals.total_cost_usd),
        total_requests: totals.request_count,
        total_tokens_in,
        total_tokens_out,
        total_tokens: total_tokens_in + total_tokens_out,
        by_provider: by_provider
            .into_iter()
            .map(|row| aggregate(row, AggregateColumn::Provider))
            .collect(),
        by_model: by_model
            .into_iter()
            .map(|row| aggregate(row, AggregateColumn::Model))
            .collect(),
    }))
}

/// Paginated cost rows, newest first.
pub async fn cost_records(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CostQueryParams>,
) -> Result<Json<Vec<CostRecordDetail>>> {
    let api_key = state.authenticator.authenticate(&headers).await?;
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = state
        .db
        .list_cost_records(api_key.id, &params.filter(), limit, offset)
        .await
        .map_err(internal)?;

    Ok(Json(rows.into_iter().map(record_detail).collect()))
}

/// The most recent transactions plus the all-time count.
pub async fn recent_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CostQueryParams>,
) -> Result<Json<RecentTransactionsResponse>> {
    let api_key = state.authenticator.authenticate(&headers).await?;
    let limit = params.limit.unwrap_or(10).clamp(1, 100);

    let rows = state
        .db
        .list_cost_records(api_key.id, &CostFilter::default(), limit, 0)
        .await
        .map_err(internal)?;
    let total = state
        .db
        .count_cost_records(api_key.id)
        .await
        .map_err(internal)?;

    let transactions = rows
        .into_iter()
        .map(|row| TransactionRecord {
            id: row.id.to_string(),
            timestamp: row.created_at,
            provider: row.provider,
            model: row.model,
            tokens: i64::from(row.tokens_in) + i64::from(row.tokens_out),
            cost_usd: decimal_to_f64(Some(row.cost_usd)),
            latency_ms: row.latency_ms,
        })
        .collect();

    Ok(Json(RecentTransactionsResponse {
        transactions,
        total,
    }))
}

/// Static provider catalog; no auth, nothing caller-specific.
pub async fn list_providers() -> Json<Vec<ProviderInfo>> {
    Json(vec![
        ProviderInfo {
            name: ProviderKind::OpenAi.as_str(),
            display_name: ProviderKind::OpenAi.display_name(),
            description: "Reliable general performance. Best for fast responses and high quality.",
            models: vec!["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo-preview"],
            pricing_note: "$0.0015/1K input, $0.002/1K output (GPT-3.5). GPT-4: $0.03/$0.06",
        },
        ProviderInfo {
            name: ProviderKind::DeepSeek.as_str(),
            display_name: ProviderKind::DeepSeek.display_name(),
            description: "Cost-effective operations. Best for high-volume, cost-sensitive tasks.",
            models: vec!["deepseek-chat", "deepseek-coder"],
            pricing_note: "$0.00014/1K input, $0.00028/1K output",
        },
        ProviderInfo {
            name: ProviderKind::HuggingFace.as_str(),
            display_name: ProviderKind::HuggingFace.display_name(),
            description: "Open-source models. Best for reasoning tasks and cost-free operations.",
            models: vec!["llama-3", "mixtral", "qwen"],
            pricing_note: "Free (via Inference API)",
        },
    ])
}

fn aggregate(row: CostAggregateRow, column: AggregateColumn) -> CostAggregate {
    let total_tokens_in = row.total_tokens_in.unwrap_or(0);
    let total_tokens_out = row.total_tokens_out.unwrap_or(0);
    let (provider, model) = match column {
        AggregateColumn::Provider => (Some(row.group_key), None),
        AggregateColumn::Model => (None, Some(row.group_key)),
    };
    CostAggregate {
        provider,
        model,
        total_cost_usd: decimal_to_f64(row.total_cost_usd),
        request_count: row.request_count,
        total_tokens_in,
        total_tokens_out,
        total_tokens: total_tokens_in + total_tokens_out,
        avg_latency_ms: row.avg_latency_ms.unwrap_or(0.0),
    }
}

fn record_detail(row: CostRecordRow) -> CostRecordDetail {
    CostRecordDetail {
        id: row.id.to_string(),
        request_id: row.request_id,
        provider: row.provider,
        model: row.model,
        tokens_in: row.tokens_in,
        tokens_out: row.tokens_out,
        total_tokens: i64::from(row.tokens_in) + i64::from(row.tokens_out),
        cost_usd: decimal_to_f64(Some(row.cost_usd)),
        latency_ms: row.latency_ms,
        created_at: row.created_at,
    }
}

fn decimal_to_f64(value: Option<Decimal>) -> f64 {
    value.and_then(|d| d.to_f64()).unwrap_or(0.0)
}

fn internal(error: sqlx::Error) -> GatewayError {
    GatewayError::Internal(error.into())
}
