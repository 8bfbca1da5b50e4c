//! HTTP request handlers: the chat-completion pipeline, health, metrics,
//! and routing preview.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::api::models::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, MessageBody, RoutingPreviewParams,
    RoutingPreviewResponse, Usage,
};
use crate::api::AppState;
use crate::core::database::NewCostRecord;
use crate::core::error::{GatewayError, Result};
use crate::core::logging::generate_request_id;
use crate::core::metrics::get_metrics;
use crate::cost::calculate_cost;
use crate::providers::ProviderResponse;
use crate::routing::{route, BudgetLevel, RouteHints, TaskKind, FALLBACK_ORDER};
use crate::services::call_with_fallback;

/// Chat completion endpoint.
///
/// Pipeline: authenticate, admit under the rate limit, validate, route,
/// drive the fallback chain, then record cost and metrics for the winning
/// attempt.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>> {
    let request_id = generate_request_id();
    let metrics = get_metrics();

    let api_key = state.authenticator.authenticate(&headers).await?;
    let api_key_label = api_key.id.to_string();

    if let Err(rejection) = state
        .rate_limiter
        .check(api_key.id, api_key.rate_limit_per_minute.max(1) as u32)
    {
        tracing::warn!(
            request_id = %request_id,
            api_key_id = %api_key_label,
            "Rate limit exceeded"
        );
        return Err(rejection);
    }

    let (hints, provider_request) = body.validate()?;
    let decision = route(&hints);
    let chain = state.providers.chain(&decision.chain());

    let started = Instant::now();
    let outcome = call_with_fallback(
        &chain,
        &provider_request,
        state.settings.provider_timeout(),
        &request_id,
        api_key.id,
        &state.executor_options,
    )
    .await;
    let elapsed = started.elapsed();

    let success = match outcome {
        Ok(success) => success,
        Err(error) => {
            metrics
                .requests_total
                .with_label_values(&[&api_key_label, error.provider(), "failure"])
                .inc();
            tracing::error!(
                request_id = %request_id,
                api_key_id = %api_key_label,
                error_type = error.error_type(),
                error = %error,
                "All providers failed"
            );
            return Err(GatewayError::ProvidersExhausted {
                request_id,
                source: error,
            });
        }
    };

    let response = success.response;
    let provider = success.provider;

    let cost_usd =
        calculate_cost(provider, &response.model, response.tokens_in, response.tokens_out)
            .round_dp(6);

    metrics
        .requests_total
        .with_label_values(&[&api_key_label, provider, "success"])
        .inc();
    metrics
        .latency_seconds
        .with_label_values(&[&api_key_label, provider])
        .observe(elapsed.as_secs_f64());

    state
        .cost_tracker
        .record(NewCostRecord {
            api_key_id: api_key.id,
            request_id: request_id.clone(),
            provider: provider.to_string(),
            model: response.model.clone(),
            tokens_in: i64::from(response.tokens_in),
            tokens_out: i64::from(response.tokens_out),
            cost_usd,
            latency_ms: response.latency_ms as i64,
        })
        .await;

    let cost_usd = cost_usd.to_f64().unwrap_or(0.0);
    tracing::info!(
        request_id = %request_id,
        api_key_id = %api_key_label,
        provider = provider,
        latency_ms = response.latency_ms,
        cost_usd = cost_usd,
        fallback_used = success.fallback_used,
        "Request completed"
    );

    Ok(Json(build_completion_response(
        response, provider, cost_usd,
    )))
}

/// Shape the normalized provider response into the client contract.
fn build_completion_response(
    response: ProviderResponse,
    provider: &str,
    cost_usd: f64,
) -> ChatCompletionResponse {
    let total_tokens = response.tokens_in + response.tokens_out;
    ChatCompletionResponse {
        id: response.id,
        object: "chat.completion",
        created: Utc::now().timestamp(),
        model: response.model,
        choices: vec![Choice {
            index: 0,
            message: MessageBody {
                role: "assistant".to_string(),
                content: response.content,
            },
            finish_reason: response.finish_reason,
        }],
        usage: Usage {
            prompt_tokens: response.tokens_in,
            completion_tokens: response.tokens_out,
            total_tokens,
        },
        provider: provider.to_string(),
        cost_usd,
    }
}

/// Preview which provider the router would pick for the given hints.
/// Unauthenticated: it reveals only the static routing rules.
pub async fn routing_preview(
    Query(params): Query<RoutingPreviewParams>,
) -> Json<RoutingPreviewResponse> {
    Json(build_routing_preview(&params))
}

fn build_routing_preview(params: &RoutingPreviewParams) -> RoutingPreviewResponse {
    let hints = RouteHints {
        task: params.task.as_deref().and_then(TaskKind::parse),
        budget: params.budget.as_deref().and_then(BudgetLevel::parse),
        latency_sensitive: params.latency_sensitive,
    };
    let decision = route(&hints);

    RoutingPreviewResponse {
        selected_provider: decision.primary.as_str().to_string(),
        provider_name: decision.primary.display_name().to_string(),
        reason: decision.reason,
        fallback_chain: FALLBACK_ORDER
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
    }
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %error, "Failed to encode metrics");
    }
    let content_type = encoder.format_type().to_string();

    ([(axum::http::header::CONTENT_TYPE, content_type)], buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_response_shape() {
        let response = ProviderResponse {
            id: "chatcmpl-xyz".to_string(),
            model: "deepseek-chat".to_string(),
            content: "Summary of X".to_string(),
            finish_reason: Some("stop".to_string()),
            tokens_in: 10,
            tokens_out: 5,
            tokens_estimated: false,
            latency_ms: 12,
        };
        let body = build_completion_response(response, "deepseek", 0.000003);

        assert_eq!(body.object, "chat.completion");
        assert_eq!(body.choices.len(), 1);
        assert_eq!(body.choices[0].message.role, "assistant");
        assert_eq!(body.usage.total_tokens, 15);
        assert_eq!(body.provider, "deepseek");
        assert!((body.cost_usd - 0.000003).abs() < 1e-12);
    }

    #[test]
    fn test_routing_preview_reasoning() {
        let preview = build_routing_preview(&RoutingPreviewParams {
            task: Some("reasoning".to_string()),
            budget: None,
            latency_sensitive: false,
        });
        assert_eq!(preview.selected_provider, "huggingface");
        assert_eq!(preview.provider_name, "HuggingFace");
        assert!(!preview.reason.is_empty());
        assert_eq!(
            preview.fallback_chain,
            vec!["openai", "deepseek", "huggingface"]
        );
    }

    #[test]
    fn test_routing_preview_is_byte_identical() {
        let params = RoutingPreviewParams {
            task: Some("reasoning".to_string()),
            budget: None,
            latency_sensitive: false,
        };
        let first = serde_json::to_string(&build_routing_preview(&params)).unwrap();
        let second = serde_json::to_string(&build_routing_preview(&params)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_routing_preview_default() {
        let preview = build_routing_preview(&RoutingPreviewParams {
            task: None,
            budget: None,
            latency_sensitive: false,
        });
        assert_eq!(preview.selected_provider, "openai");
        assert_eq!(preview.reason, "Default routing (OpenAI)");
    }
}
