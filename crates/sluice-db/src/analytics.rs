//! Read-side aggregation over users, posts, and comments.

use chrono::{DateTime, Utc};
use sluice_core::{AnalyticsReport, EngagementMetric};
use sqlx::sqlite::SqlitePool;

use crate::unit_of_work::UnitOfWork;
use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    users: i64,
    posts: i64,
    comments: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct EngagementRow {
    title: String,
    comment_count: i64,
    author: Option<String>,
}

impl From<EngagementRow> for EngagementMetric {
    fn from(row: EngagementRow) -> Self {
        Self {
            title: row.title,
            comment_count: row.comment_count,
            author: row.author,
        }
    }
}

/// Compute the report from the rows visible to `uow`, keeping the `top_n`
/// most-commented posts.
///
/// Ties are broken by id so the output is stable: the lowest user id wins
/// "most active", and equally-commented posts appear in id order.
///
/// # Errors
///
/// Returns [`DbError`] if any aggregate query fails.
pub async fn generate_report(
    uow: &UnitOfWork,
    top_n: i64,
    generated_at: DateTime<Utc>,
) -> Result<AnalyticsReport, DbError> {
    let mut guard = uow.lock_session().await;
    let conn = guard.as_deref_mut().ok_or(DbError::SessionClosed)?;

    let totals = sqlx::query_as::<_, TotalsRow>(
        "SELECT \
             (SELECT COUNT(*) FROM users) AS users, \
             (SELECT COUNT(*) FROM posts) AS posts, \
             (SELECT COUNT(*) FROM comments) AS comments",
    )
    .fetch_one(&mut *conn)
    .await?;

    // Mean group size over authors with at least one post.
    let average_posts_per_user = sqlx::query_scalar::<_, Option<f64>>(
        "SELECT AVG(post_count) FROM \
             (SELECT user_id, COUNT(*) AS post_count FROM posts GROUP BY user_id)",
    )
    .fetch_one(&mut *conn)
    .await?
    .unwrap_or(0.0);

    let most_active_user = sqlx::query_scalar::<_, String>(
        "SELECT u.name FROM users u \
         JOIN posts p ON p.user_id = u.id \
         GROUP BY u.id, u.name \
         ORDER BY COUNT(p.id) DESC, u.id ASC \
         LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;

    let engagement_metrics = sqlx::query_as::<_, EngagementRow>(
        "SELECT p.title AS title, COUNT(c.id) AS comment_count, u.name AS author \
         FROM posts p \
         LEFT JOIN comments c ON c.post_id = p.id \
         LEFT JOIN users u ON u.id = p.user_id \
         GROUP BY p.id, p.title, u.name \
         ORDER BY comment_count DESC, p.id ASC \
         LIMIT ?1",
    )
    .bind(top_n.max(0))
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(EngagementMetric::from)
    .collect();

    Ok(AnalyticsReport {
        generated_at,
        total_users: totals.users,
        total_posts: totals.posts,
        total_comments: totals.comments,
        average_posts_per_user,
        most_active_user,
        engagement_metrics,
    })
}

/// Open a read-only unit of work on `pool` and compute the report in it.
///
/// # Errors
///
/// Returns [`DbError`] if the transaction or any aggregate query fails.
pub async fn analytics_report(pool: &SqlitePool, top_n: i64) -> Result<AnalyticsReport, DbError> {
    let uow = UnitOfWork::begin(pool).await?;
    let report = generate_report(&uow, top_n, Utc::now()).await?;
    uow.rollback().await?;
    Ok(report)
}
