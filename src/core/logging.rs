//! Structured logging setup and request correlation.
//!
//! Log output is one JSON object per line with event fields flattened, so a
//! `request_id` attached to an event becomes a top-level key that can be
//! joined against persisted cost rows.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from the configured
/// `LOG_LEVEL`. Noisy HTTP-stack crates are pinned to `warn` either way.
pub fn init_logging(log_level: &str) {
    let base_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_lowercase());

    // Always suppress verbose hyper/reqwest internals regardless of the
    // requested level.
    let filter_str = format!("{base_filter},hyper=warn,h2=warn,reqwest=warn");
    let filter = EnvFilter::new(filter_str);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();
}

/// Generate a per-request correlation identifier: `req-` plus 16 hex chars.
pub fn generate_request_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("req-{}", &hex[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_shape() {
        let id = generate_request_id();
        assert!(id.starts_with("req-"));
        assert_eq!(id.len(), "req-".len() + 16);
        assert!(id["req-".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }
}
