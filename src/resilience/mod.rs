//! Resilience helpers for outbound calls.
//!
//! # Design Decisions
//! - Exponential backoff with bounded jitter between retries
//! - Callers decide what is retryable

pub mod backoff;

pub use backoff::{calculate_backoff, RetryPolicy};
