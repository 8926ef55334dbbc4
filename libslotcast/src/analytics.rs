//! Engagement metrics helpers
//!
//! Pure, stateless derivations over per-post counters. Nothing here touches
//! the queue or the store.

use serde::{Deserialize, Serialize};

/// A snapshot of engagement counters for one post
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngagementMetrics {
    pub impressions: i64,
    pub reach: i64,
    pub likes: i64,
    pub shares: i64,
}

impl EngagementMetrics {
    pub fn total_engagements(&self) -> i64 {
        self.likes + self.shares
    }
}

/// Likes plus shares over impressions, as a plain ratio
///
/// Zero or negative impressions yield 0.0 rather than dividing by zero.
/// Callers wanting a percentage multiply by 100 themselves.
pub fn engagement_rate(metrics: &EngagementMetrics) -> f64 {
    if metrics.impressions <= 0 {
        return 0.0;
    }
    metrics.total_engagements() as f64 / metrics.impressions as f64
}
