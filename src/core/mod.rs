//! Core functionality: configuration, errors, logging, metrics, rate
//! limiting, and persistence.

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod rate_limiter;

pub use config::Settings;
pub use database::Database;
pub use error::{GatewayError, Result};
pub use metrics::{get_metrics, init_metrics};
pub use rate_limiter::RateLimiter;
