//! Sample dataset for local development and demos.
//!
//! Populates users, posts, comments, and a short run history so the API and
//! reports have something to show before the first real pipeline run.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sluice_core::{
    Address, Comment, Company, Geo, PipelineRun, PipelineStatus, Post, RunMetadata, User,
};
use sqlx::sqlite::SqlitePool;

use crate::unit_of_work::transaction;
use crate::DbError;

/// Rows written by [`seed_mock_data`]. All zero when seeding was skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub pipeline_runs: usize,
}

impl SeedSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Insert the sample dataset in a single transaction.
///
/// Does nothing when any user already exists, so it is safe to call on every
/// start-up. If any insert fails the whole batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn seed_mock_data(pool: &SqlitePool) -> Result<SeedSummary, DbError> {
    let now = Utc::now();
    let users = mock_users(now);
    let posts = mock_posts(now);
    let comments = mock_comments(now);
    let runs = mock_pipeline_runs(now);

    let summary = transaction(pool, |uow| {
        Box::pin(async move {
            if !uow.users().get_all().await?.is_empty() {
                return Ok(SeedSummary::default());
            }
            for user in &users {
                uow.users().add(user).await?;
            }
            for post in &posts {
                uow.posts().add(post).await?;
            }
            for comment in &comments {
                uow.comments().add(comment).await?;
            }
            for run in &runs {
                uow.pipeline_runs().add(run).await?;
            }
            Ok::<_, DbError>(SeedSummary {
                users: users.len(),
                posts: posts.len(),
                comments: comments.len(),
                pipeline_runs: runs.len(),
            })
        })
    })
    .await?;

    if summary.is_empty() {
        tracing::info!("sample data already present; skipping seed");
    } else {
        tracing::info!(
            users = summary.users,
            posts = summary.posts,
            comments = summary.comments,
            pipeline_runs = summary.pipeline_runs,
            "seeded sample data"
        );
    }
    Ok(summary)
}

struct UserSeed {
    name: &'static str,
    username: &'static str,
    phone: &'static str,
    website: &'static str,
    street: &'static str,
    suite: &'static str,
    city: &'static str,
    zipcode: &'static str,
    geo: (f64, f64),
    company: (&'static str, &'static str, &'static str),
    age_days: i64,
}

const USERS: [UserSeed; 5] = [
    UserSeed {
        name: "Alice Johnson",
        username: "alice_j",
        phone: "1234567890",
        website: "http://alice-blog.com",
        street: "123 Main St",
        suite: "Apt 4B",
        city: "New York",
        zipcode: "10001",
        geo: (40.7128, -74.0060),
        company: (
            "Tech Innovations Inc",
            "Innovation at its finest",
            "cutting-edge solutions",
        ),
        age_days: 30,
    },
    UserSeed {
        name: "Bob Smith",
        username: "bob_smith",
        phone: "0987654321",
        website: "http://bobsmith.dev",
        street: "456 Oak Ave",
        suite: "Suite 200",
        city: "San Francisco",
        zipcode: "94102",
        geo: (37.7749, -122.4194),
        company: (
            "Digital Solutions LLC",
            "Digital transformation made easy",
            "scalable digital platforms",
        ),
        age_days: 25,
    },
    UserSeed {
        name: "Carol Davis",
        username: "carol_d",
        phone: "5551234567",
        website: "http://caroldavis.io",
        street: "789 Pine St",
        suite: "",
        city: "Seattle",
        zipcode: "98101",
        geo: (47.6062, -122.3321),
        company: (
            "Creative Minds Studio",
            "Where creativity meets technology",
            "innovative creative solutions",
        ),
        age_days: 20,
    },
    UserSeed {
        name: "David Wilson",
        username: "david_w",
        phone: "7778889999",
        website: "http://davidwilson.net",
        street: "321 Elm St",
        suite: "Floor 3",
        city: "Austin",
        zipcode: "73301",
        geo: (30.2672, -97.7431),
        company: (
            "Data Analytics Pro",
            "Turning data into insights",
            "advanced analytics solutions",
        ),
        age_days: 15,
    },
    UserSeed {
        name: "Eva Martinez",
        username: "eva_m",
        phone: "3334445555",
        website: "http://evamartinez.com",
        street: "654 Maple Dr",
        suite: "Unit 12",
        city: "Miami",
        zipcode: "33101",
        geo: (25.7617, -80.1918),
        company: (
            "Global Consulting Group",
            "Global solutions, local expertise",
            "strategic business consulting",
        ),
        age_days: 10,
    },
];

/// `(user_id, title, body, age_days)`; post ids are assigned in order from 1.
const POSTS: [(i64, &str, &str, i64); 10] = [
    (
        1,
        "Getting Started with Data Engineering",
        "Data engineering focuses on the design and construction of systems for collecting, storing, and analyzing data at scale.",
        5,
    ),
    (
        1,
        "Best Practices for Database Design",
        "Designing efficient databases requires careful consideration of normalization, indexing, and query optimization.",
        3,
    ),
    (
        2,
        "Introduction to Clean Architecture",
        "Clean Architecture emphasizes separation of concerns and dependency inversion for maintainable, testable code.",
        7,
    ),
    (
        2,
        "Applying SOLID Principles",
        "The SOLID principles are fundamental guidelines for structuring programs that stay easy to change.",
        2,
    ),
    (
        3,
        "Modern Frontend Development with React",
        "React's component-based architecture changed how user interfaces are built.",
        6,
    ),
    (
        3,
        "State Management in Large Applications",
        "Managing state in large applications is hard; this post compares several approaches.",
        1,
    ),
    (
        4,
        "Data Visualization Basics",
        "Effective visualization is key to understanding complex datasets.",
        4,
    ),
    (
        4,
        "Machine Learning Pipeline Automation",
        "Automating ML pipelines improves efficiency and reproducibility.",
        8,
    ),
    (
        5,
        "Microservices Architecture Patterns",
        "Microservices offer scalability and flexibility but come with their own patterns and anti-patterns.",
        9,
    ),
    (
        5,
        "DevOps Best Practices for Modern Applications",
        "CI/CD, infrastructure as code, and monitoring for delivering reliable software at scale.",
        12,
    ),
];

/// `(post_id, name, email, body, age_hours)`; comment ids are assigned in order from 1.
const COMMENTS: [(i64, &str, &str, &str, i64); 12] = [
    (
        1,
        "Great introduction!",
        "reader1@example.com",
        "Looking forward to more posts on this topic!",
        96,
    ),
    (
        1,
        "Very helpful",
        "student@university.edu",
        "This really helped me understand the basics.",
        96,
    ),
    (
        2,
        "Database expert",
        "dba@company.com",
        "Consider partitioning for large tables too.",
        48,
    ),
    (
        3,
        "Architecture enthusiast",
        "architect@tech.com",
        "Dependency inversion is particularly powerful.",
        144,
    ),
    (
        3,
        "Question about implementation",
        "developer@startup.io",
        "How do you keep this manageable in smaller projects?",
        144,
    ),
    (
        4,
        "Developer",
        "dev@code.com",
        "The examples you provided are very clear.",
        24,
    ),
    (
        5,
        "React fan",
        "frontend@web.dev",
        "Have you tried the new concurrent features?",
        120,
    ),
    (
        6,
        "State management question",
        "junior@company.com",
        "What would you recommend for a medium-sized store?",
        12,
    ),
    (
        7,
        "Data scientist",
        "datascientist@research.org",
        "Excellent overview of visualization libraries.",
        72,
    ),
    (
        8,
        "ML engineer",
        "mlengineer@ai.com",
        "Pipeline automation is crucial for production ML systems.",
        168,
    ),
    (
        9,
        "Microservices practitioner",
        "architect@enterprise.com",
        "Circuit breakers have saved us from many cascading failures.",
        192,
    ),
    (
        10,
        "DevOps engineer",
        "devops@cloud.com",
        "Infrastructure as code is a must-have.",
        264,
    ),
];

fn mock_users(now: DateTime<Utc>) -> Vec<User> {
    USERS
        .iter()
        .zip(1_i64..)
        .map(|(seed, id)| User {
            id,
            name: seed.name.to_owned(),
            username: seed.username.to_owned(),
            email: format!("{}@example.com", seed.name.to_lowercase().replace(' ', ".")),
            phone: seed.phone.to_owned(),
            website: seed.website.to_owned(),
            address: Address {
                street: seed.street.to_owned(),
                suite: seed.suite.to_owned(),
                city: seed.city.to_owned(),
                zipcode: seed.zipcode.to_owned(),
                geo: Some(Geo {
                    lat: seed.geo.0,
                    lng: seed.geo.1,
                }),
            },
            company: Company {
                name: seed.company.0.to_owned(),
                catch_phrase: seed.company.1.to_owned(),
                bs: seed.company.2.to_owned(),
            },
            created_at: now - Duration::days(seed.age_days),
        })
        .collect()
}

fn mock_posts(now: DateTime<Utc>) -> Vec<Post> {
    POSTS
        .iter()
        .zip(1_i64..)
        .map(|(&(user_id, title, body, age_days), id)| Post {
            id,
            user_id,
            title: title.to_owned(),
            body: body.to_owned(),
            created_at: now - Duration::days(age_days),
        })
        .collect()
}

fn mock_comments(now: DateTime<Utc>) -> Vec<Comment> {
    COMMENTS
        .iter()
        .zip(1_i64..)
        .map(|(&(post_id, name, email, body, age_hours), id)| Comment {
            id,
            post_id,
            name: name.to_owned(),
            email: email.to_owned(),
            body: body.to_owned(),
            created_at: now - Duration::hours(age_hours),
        })
        .collect()
}

fn mock_pipeline_runs(now: DateTime<Utc>) -> Vec<PipelineRun> {
    let counts = || -> RunMetadata {
        let mut metadata = RunMetadata::new();
        metadata.insert("users_processed".to_owned(), json!(5));
        metadata.insert("posts_processed".to_owned(), json!(10));
        metadata.insert("comments_processed".to_owned(), json!(12));
        metadata
    };

    let finished = |started_at: DateTime<Utc>, took: Duration, status: PipelineStatus| {
        PipelineRun {
            status,
            completed_at: Some(started_at + took),
            ..PipelineRun::pending(started_at)
        }
    };

    let mut failed = finished(
        now - Duration::days(2),
        Duration::minutes(5),
        PipelineStatus::Failed,
    );
    failed.error_message = Some("API rate limit exceeded".to_owned());
    failed.records_processed = Some(0);
    failed.metadata = Some(RunMetadata::new());

    let mut yesterday = finished(
        now - Duration::days(1),
        Duration::minutes(30),
        PipelineStatus::Success,
    );
    yesterday.records_processed = Some(27);
    yesterday.metadata = Some(counts());

    let mut recent = finished(
        now - Duration::hours(2),
        Duration::minutes(15),
        PipelineStatus::Success,
    );
    recent.records_processed = Some(27);
    recent.metadata = Some(counts());

    vec![failed, yesterday, recent]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect_in_memory;
    use crate::unit_of_work::UnitOfWork;

    #[tokio::test]
    async fn seeds_once_then_skips() {
        let pool = connect_in_memory().await.unwrap();

        let first = seed_mock_data(&pool).await.unwrap();
        assert_eq!(
            first,
            SeedSummary {
                users: 5,
                posts: 10,
                comments: 12,
                pipeline_runs: 3,
            }
        );

        let second = seed_mock_data(&pool).await.unwrap();
        assert!(second.is_empty());

        let uow = UnitOfWork::begin(&pool).await.unwrap();
        assert_eq!(uow.users().get_all().await.unwrap().len(), 5);
        assert_eq!(uow.pipeline_runs().get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn seeded_runs_are_listed_newest_first() {
        let pool = connect_in_memory().await.unwrap();
        seed_mock_data(&pool).await.unwrap();

        let uow = UnitOfWork::begin(&pool).await.unwrap();
        let runs = uow.pipeline_runs().get_recent(10).await.unwrap();

        let statuses: Vec<PipelineStatus> = runs.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                PipelineStatus::Success,
                PipelineStatus::Success,
                PipelineStatus::Failed
            ]
        );
        assert_eq!(
            runs[2].error_message.as_deref(),
            Some("API rate limit exceeded")
        );
    }

    #[test]
    fn sample_emails_are_lowercase_and_unique() {
        let users = mock_users(Utc::now());
        assert_eq!(users[0].email, "alice.johnson@example.com");
        let mut emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        emails.sort_unstable();
        emails.dedup();
        assert_eq!(emails.len(), users.len());
    }
}
