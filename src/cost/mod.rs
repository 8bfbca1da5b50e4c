//! Pricing table and cost calculation.
//!
//! All arithmetic is fixed-precision decimal; binary floats drift on sums of
//! per-request costs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub mod tracker;

pub use tracker::CostTracker;

/// One pricing table entry. An empty `model_prefix` is the provider's
/// default entry and matches any model.
#[derive(Debug, Clone, Copy)]
pub struct PricingEntry {
    pub provider: &'static str,
    pub model_prefix: &'static str,
    pub price_in_per_1k_usd: Decimal,
    pub price_out_per_1k_usd: Decimal,
}

/// Static pricing, USD per 1k tokens.
pub static PRICING: [PricingEntry; 4] = [
    PricingEntry {
        provider: "openai",
        model_prefix: "gpt-4",
        price_in_per_1k_usd: dec!(0.03),
        price_out_per_1k_usd: dec!(0.06),
    },
    PricingEntry {
        provider: "openai",
        model_prefix: "gpt-3.5",
        price_in_per_1k_usd: dec!(0.0015),
        price_out_per_1k_usd: dec!(0.002),
    },
    PricingEntry {
        provider: "deepseek",
        model_prefix: "",
        price_in_per_1k_usd: dec!(0.00014),
        price_out_per_1k_usd: dec!(0.00028),
    },
    PricingEntry {
        provider: "huggingface",
        model_prefix: "",
        price_in_per_1k_usd: dec!(0),
        price_out_per_1k_usd: dec!(0),
    },
];

/// Find the pricing entry for `(provider, model)`: longest matching
/// `model_prefix` wins, the provider's default entry (empty prefix) is the
/// fallback, and an unknown provider has no entry.
fn lookup_entry(provider: &str, model: &str) -> Option<&'static PricingEntry> {
    PRICING
        .iter()
        .filter(|entry| entry.provider == provider && model.starts_with(entry.model_prefix))
        .max_by_key(|entry| entry.model_prefix.len())
}

/// Cost in USD for one request. Unknown models and providers cost zero so
/// they can still be served and recorded.
pub fn calculate_cost(provider: &str, model: &str, tokens_in: u32, tokens_out: u32) -> Decimal {
    let Some(entry) = lookup_entry(provider, model) else {
        return Decimal::ZERO;
    };

    let thousand = dec!(1000);
    let input_cost = Decimal::from(tokens_in) / thousand * entry.price_in_per_1k_usd;
    let output_cost = Decimal::from(tokens_out) / thousand * entry.price_out_per_1k_usd;
    input_cost + output_cost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deepseek_summarization_cost() {
        // 10 in / 5 out: 10/1000*0.00014 + 5/1000*0.00028 = 0.0000028
        let cost = calculate_cost("deepseek", "deepseek-chat", 10, 5);
        assert_eq!(cost, dec!(0.0000028));
        assert_eq!(cost.round_dp(6), dec!(0.000003));
    }

    #[test]
    fn test_deepseek_fallback_cost() {
        let cost = calculate_cost("deepseek", "deepseek-chat", 20, 10);
        assert_eq!(cost, dec!(0.0000056));
    }

    #[test]
    fn test_gpt4_pricing() {
        let cost = calculate_cost("openai", "gpt-4", 1000, 1000);
        assert_eq!(cost, dec!(0.09));
    }

    #[test]
    fn test_longest_prefix_wins() {
        // "gpt-4-turbo-preview" matches the gpt-4 prefix, not gpt-3.5.
        let cost = calculate_cost("openai", "gpt-4-turbo-preview", 1000, 0);
        assert_eq!(cost, dec!(0.03));

        let cost = calculate_cost("openai", "gpt-3.5-turbo-16k", 1000, 0);
        assert_eq!(cost, dec!(0.0015));
    }

    #[test]
    fn test_unknown_openai_model_costs_zero() {
        // openai has no default entry, so unmatched models fall to zero.
        assert_eq!(calculate_cost("openai", "davinci-002", 500, 500), Decimal::ZERO);
    }

    #[test]
    fn test_provider_default_entry_matches_any_model() {
        assert_eq!(
            calculate_cost("deepseek", "deepseek-coder", 1000, 1000),
            dec!(0.00042)
        );
        assert_eq!(
            calculate_cost("huggingface", "meta-llama/Meta-Llama-3-8B-Instruct", 9999, 9999),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_unknown_provider_costs_zero() {
        assert_eq!(calculate_cost("anthropic", "claude-3", 100, 100), Decimal::ZERO);
    }

    #[test]
    fn test_zero_tokens_cost_zero() {
        assert_eq!(calculate_cost("openai", "gpt-4", 0, 0), Decimal::ZERO);
    }
}
