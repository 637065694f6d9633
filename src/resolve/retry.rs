//! Bounded retry with exponential backoff
//!
//! Applied at the operation level by callers of the crawler and the
//! oracle. This is coarser than, and separate from, the per-fetch
//! rate-limit wait inside the session.

use crate::config::RetryConfig;
use std::fmt::Display;
use std::ops::AsyncFnMut;
use std::time::Duration;

/// Retry parameters for one operation class
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Runs a fallible async operation with bounded retries
///
/// The delay grows linearly with the attempt number (base, 2x base, ...).
/// When the attempts are spent the last error surfaces unchanged.
pub async fn with_retry<T, E: Display>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: impl AsyncFnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut attempt = 1u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    %error,
                    "operation attempt failed"
                );
                if attempt >= policy.max_attempts {
                    return Err(error);
                }
                tokio::time::sleep(policy.base_delay * attempt).await;
                attempt += 1;
            }
        }
    }
}
