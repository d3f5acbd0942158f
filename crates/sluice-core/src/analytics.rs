use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of posts kept in [`AnalyticsReport::engagement_metrics`] unless
/// configured otherwise.
pub const DEFAULT_ENGAGEMENT_TOP_N: i64 = 10;

/// Summary computed from the stored users, posts, and comments. Derived on
/// demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub total_users: i64,
    pub total_posts: i64,
    pub total_comments: i64,
    /// Mean number of posts among users with at least one post; `0.0` when
    /// there are no posts.
    pub average_posts_per_user: f64,
    /// Name of the user with the most posts, `None` when no stored user has
    /// written a post.
    pub most_active_user: Option<String>,
    /// Posts ranked by descending comment count.
    pub engagement_metrics: Vec<EngagementMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetric {
    pub title: String,
    pub comment_count: i64,
    /// `None` when the post's author is not stored.
    pub author: Option<String>,
}

impl AnalyticsReport {
    /// Report for a store with no rows at all.
    #[must_use]
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            total_users: 0,
            total_posts: 0,
            total_comments: 0,
            average_posts_per_user: 0.0,
            most_active_user: None,
            engagement_metrics: Vec::new(),
        }
    }
}
