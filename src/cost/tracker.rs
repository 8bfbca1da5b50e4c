//! Cost recording: one persisted row per successful provider attempt.

use rust_decimal::prelude::ToPrimitive;

use crate::core::database::{Database, NewCostRecord};
use crate::core::metrics::get_metrics;

/// Persists cost rows and keeps the process-wide cost counter current.
#[derive(Clone)]
pub struct CostTracker {
    db: Database,
}

impl CostTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record one successful attempt.
    ///
    /// The write is synchronous relative to the HTTP response but
    /// best-effort: the upstream completion has already been produced, so a
    /// failed write is logged at error level and the request still
    /// succeeds. Failed provider attempts never reach this method.
    pub async fn record(&self, record: NewCostRecord) {
        let metrics = get_metrics();
        metrics
            .cost_total
            .with_label_values(&[
                &record.api_key_id.to_string(),
                &record.provider,
                &record.model,
            ])
            .inc_by(record.cost_usd.to_f64().unwrap_or(0.0));

        if let Err(error) = self.db.insert_cost_record(&record).await {
            tracing::error!(
                request_id = %record.request_id,
                api_key_id = %record.api_key_id,
                provider = %record.provider,
                error = %error,
                "Failed to persist cost record"
            );
        }
    }
}
