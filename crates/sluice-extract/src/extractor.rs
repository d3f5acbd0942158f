use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::{RawRecord, RawSnapshot, Resource};

/// Source of raw records for one pipeline run.
///
/// Implementors only provide [`Extractor::extract`]; the per-resource helpers
/// and the concurrent [`Extractor::extract_all`] are built on it.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch every record of `resource`.
    async fn extract(&self, resource: Resource) -> Result<Vec<RawRecord>, ExtractError>;

    async fn extract_users(&self) -> Result<Vec<RawRecord>, ExtractError> {
        self.extract(Resource::Users).await
    }

    async fn extract_posts(&self) -> Result<Vec<RawRecord>, ExtractError> {
        self.extract(Resource::Posts).await
    }

    async fn extract_comments(&self) -> Result<Vec<RawRecord>, ExtractError> {
        self.extract(Resource::Comments).await
    }

    /// Fetch all three resources concurrently. The first failure cancels the
    /// outstanding requests and is returned; partial results are dropped.
    async fn extract_all(&self) -> Result<RawSnapshot, ExtractError> {
        let (users, posts, comments) = tokio::try_join!(
            self.extract_users(),
            self.extract_posts(),
            self.extract_comments()
        )?;
        tracing::info!(
            users = users.len(),
            posts = posts.len(),
            comments = comments.len(),
            "extraction complete"
        );
        Ok(RawSnapshot {
            users,
            posts,
            comments,
        })
    }
}

#[async_trait]
impl<T: Extractor + ?Sized> Extractor for Box<T> {
    async fn extract(&self, resource: Resource) -> Result<Vec<RawRecord>, ExtractError> {
        (**self).extract(resource).await
    }
}
