//! Engine configuration — page sizes, retry policy, query chunking.
//!
//! The backing store hands data back in fixed-size pages and rejects
//! oversized IN-lists, so every batch operation is driven by these knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows per paginated fetch. A short page signals end-of-data.
    pub page_size: usize,
    /// Maximum ids per point-lookup query.
    pub id_chunk_size: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            id_chunk_size: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded exponential backoff for transient store failures.
/// Delay doubles per attempt: base, 2*base, 4*base, ...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given failed attempt (0-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << failed_attempt)
    }
}
