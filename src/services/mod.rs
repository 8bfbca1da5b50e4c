//! Business logic: fallback execution over the routed provider chain.

pub mod fallback;

pub use fallback::{
    call_with_fallback, retry_with_backoff, BackoffPolicy, ExecutionSuccess, ExecutorOptions,
};
