//! `analytics` and `report` command handlers.

use sluice_core::{AnalyticsReport, AppConfig};
use sluice_pipeline::{ReportFormat, ReportRenderer};
use sqlx::SqlitePool;

pub(crate) async fn run_analytics(pool: &SqlitePool, top_n: i64) -> anyhow::Result<()> {
    let report = sluice_db::analytics_report(pool, top_n).await?;
    print!("{}", format_summary(&report));
    Ok(())
}

/// Render the current analytics in `format` under the configured reports
/// directory.
pub(crate) async fn run_report(
    pool: &SqlitePool,
    config: &AppConfig,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let report = sluice_db::analytics_report(pool, config.engagement_top_n).await?;
    let path = ReportRenderer::new(&config.reports_dir)
        .render(&report, format)
        .await?;
    println!("wrote {format} report to {}", path.display());
    Ok(())
}

pub(crate) fn format_summary(report: &AnalyticsReport) -> String {
    let mut out = format!(
        "generated at:       {}\n\
         users:              {}\n\
         posts:              {}\n\
         comments:           {}\n\
         posts per user:     {:.2}\n\
         most active user:   {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.total_users,
        report.total_posts,
        report.total_comments,
        report.average_posts_per_user,
        report.most_active_user.as_deref().unwrap_or("-"),
    );

    if report.engagement_metrics.is_empty() {
        out.push_str("no posts stored yet\n");
        return out;
    }

    out.push_str("\ntop posts by comments:\n");
    for (rank, metric) in report.engagement_metrics.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {:>4}  {}  ({})\n",
            rank + 1,
            metric.comment_count,
            metric.title,
            metric.author.as_deref().unwrap_or("unknown author"),
        ));
    }
    out
}
