//! Deterministic provider routing.
//!
//! Routing is a pure function over the request hints; identical hints always
//! produce an identical decision, so the choice is previewable and testable.

use crate::providers::ProviderKind;

/// Fixed fallback order. The executed chain is the primary followed by the
/// remaining providers in this order.
pub const FALLBACK_ORDER: [ProviderKind; 3] = [
    ProviderKind::OpenAi,
    ProviderKind::DeepSeek,
    ProviderKind::HuggingFace,
];

/// Task hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Summarization,
    Reasoning,
    General,
}

impl TaskKind {
    /// Lenient parse: unrecognized values route as if unset.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "summarization" => Some(TaskKind::Summarization),
            "reasoning" => Some(TaskKind::Reasoning),
            "general" => Some(TaskKind::General),
            _ => None,
        }
    }
}

/// Budget hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
}

impl BudgetLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "low" => Some(BudgetLevel::Low),
            "medium" => Some(BudgetLevel::Medium),
            "high" => Some(BudgetLevel::High),
            _ => None,
        }
    }
}

/// Inputs to the routing decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteHints {
    pub task: Option<TaskKind>,
    pub budget: Option<BudgetLevel>,
    pub latency_sensitive: bool,
}

/// The routing outcome: a primary, the fallbacks after it, and the
/// human-readable rule trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub primary: ProviderKind,
    pub fallbacks: Vec<ProviderKind>,
    pub reason: String,
}

impl RoutingDecision {
    /// The full execution chain: primary first, then fallbacks.
    pub fn chain(&self) -> Vec<ProviderKind> {
        let mut chain = Vec::with_capacity(1 + self.fallbacks.len());
        chain.push(self.primary);
        chain.extend(self.fallbacks.iter().copied());
        chain
    }
}

/// Select a provider. First matching rule wins:
/// summarization → deepseek, reasoning → huggingface, latency-sensitive →
/// openai, low budget → deepseek, high budget → openai, default → openai.
pub fn route(hints: &RouteHints) -> RoutingDecision {
    let primary = match (hints.task, hints.latency_sensitive, hints.budget) {
        (Some(TaskKind::Summarization), _, _) => ProviderKind::DeepSeek,
        (Some(TaskKind::Reasoning), _, _) => ProviderKind::HuggingFace,
        (_, true, _) => ProviderKind::OpenAi,
        (_, _, Some(BudgetLevel::Low)) => ProviderKind::DeepSeek,
        (_, _, Some(BudgetLevel::High)) => ProviderKind::OpenAi,
        _ => ProviderKind::OpenAi,
    };

    let fallbacks = FALLBACK_ORDER
        .iter()
        .copied()
        .filter(|p| *p != primary)
        .collect();

    RoutingDecision {
        primary,
        fallbacks,
        reason: describe_hints(hints),
    }
}

/// Build the rule trace shown by the routing preview endpoint.
fn describe_hints(hints: &RouteHints) -> String {
    let mut parts = Vec::new();
    match hints.task {
        Some(TaskKind::Summarization) => parts.push("Task = Summarization".to_string()),
        Some(TaskKind::Reasoning) => parts.push("Task = Reasoning".to_string()),
        _ => {}
    }
    match hints.budget {
        Some(BudgetLevel::Low) => parts.push("Budget = Low".to_string()),
        Some(BudgetLevel::High) => parts.push("Budget = High".to_string()),
        _ => {}
    }
    if hints.latency_sensitive {
        parts.push("Latency Sensitive = True".to_string());
    }

    if parts.is_empty() {
        "Default routing (OpenAI)".to_string()
    } else {
        format!("Selected because: {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarization_routes_to_deepseek() {
        let decision = route(&RouteHints {
            task: Some(TaskKind::Summarization),
            budget: Some(BudgetLevel::High),
            latency_sensitive: true,
        });
        // Task outranks both the budget and latency hints.
        assert_eq!(decision.primary, ProviderKind::DeepSeek);
        assert_eq!(
            decision.fallbacks,
            vec![ProviderKind::OpenAi, ProviderKind::HuggingFace]
        );
    }

    #[test]
    fn test_reasoning_routes_to_huggingface() {
        let decision = route(&RouteHints {
            task: Some(TaskKind::Reasoning),
            ..Default::default()
        });
        assert_eq!(decision.primary, ProviderKind::HuggingFace);
        assert_eq!(
            decision.fallbacks,
            vec![ProviderKind::OpenAi, ProviderKind::DeepSeek]
        );
    }

    #[test]
    fn test_latency_sensitive_routes_to_openai() {
        let decision = route(&RouteHints {
            task: Some(TaskKind::General),
            budget: Some(BudgetLevel::Low),
            latency_sensitive: true,
        });
        // Latency outranks budget; a "general" task does not pin a provider.
        assert_eq!(decision.primary, ProviderKind::OpenAi);
    }

    #[test]
    fn test_low_budget_routes_to_deepseek() {
        let decision = route(&RouteHints {
            budget: Some(BudgetLevel::Low),
            ..Default::default()
        });
        assert_eq!(decision.primary, ProviderKind::DeepSeek);
    }

    #[test]
    fn test_high_budget_routes_to_openai() {
        let decision = route(&RouteHints {
            budget: Some(BudgetLevel::High),
            ..Default::default()
        });
        assert_eq!(decision.primary, ProviderKind::OpenAi);
    }

    #[test]
    fn test_default_routes_to_openai() {
        let decision = route(&RouteHints::default());
        assert_eq!(decision.primary, ProviderKind::OpenAi);
        assert_eq!(
            decision.fallbacks,
            vec![ProviderKind::DeepSeek, ProviderKind::HuggingFace]
        );
        assert_eq!(decision.reason, "Default routing (OpenAI)");
    }

    #[test]
    fn test_medium_budget_falls_through_to_default() {
        let decision = route(&RouteHints {
            budget: Some(BudgetLevel::Medium),
            ..Default::default()
        });
        assert_eq!(decision.primary, ProviderKind::OpenAi);
        assert_eq!(decision.reason, "Default routing (OpenAI)");
    }

    #[test]
    fn test_chain_is_primary_plus_fallbacks() {
        let decision = route(&RouteHints {
            task: Some(TaskKind::Summarization),
            ..Default::default()
        });
        assert_eq!(
            decision.chain(),
            vec![
                ProviderKind::DeepSeek,
                ProviderKind::OpenAi,
                ProviderKind::HuggingFace
            ]
        );
    }

    #[test]
    fn test_routing_is_deterministic() {
        let hints = RouteHints {
            task: Some(TaskKind::Summarization),
            budget: Some(BudgetLevel::Low),
            latency_sensitive: false,
        };
        let first = route(&hints);
        let second = route(&hints);
        assert_eq!(first, second);
        assert_eq!(
            first.reason,
            "Selected because: Task = Summarization, Budget = Low"
        );
    }

    #[test]
    fn test_hint_parsing_is_lenient() {
        assert_eq!(TaskKind::parse("SUMMARIZATION"), Some(TaskKind::Summarization));
        assert_eq!(TaskKind::parse("translation"), None);
        assert_eq!(BudgetLevel::parse("Low"), Some(BudgetLevel::Low));
        assert_eq!(BudgetLevel::parse("unlimited"), None);
    }
}
