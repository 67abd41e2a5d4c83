//! Retry with exponential backoff for calls to unreliable remote services.

mod config;
mod policy;

pub use config::RetryConfig;
pub use policy::{Attempted, RetryError, RetryPolicy, Retryable};
