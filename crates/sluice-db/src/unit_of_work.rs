//! Transactional scope grouping the entity repositories.
//!
//! A [`UnitOfWork`] opens one transaction and hands out repositories bound to
//! it, so everything written through them becomes visible together on
//! [`UnitOfWork::commit`] or not at all. Dropping an uncommitted unit of work
//! rolls it back.

use std::sync::OnceLock;

use futures::future::BoxFuture;
use sqlx::sqlite::SqlitePool;

use crate::comments::CommentRepository;
use crate::pipeline_runs::PipelineRunRepository;
use crate::posts::PostRepository;
use crate::repository::Repository;
use crate::session::{Session, SessionGuard};
use crate::users::UserRepository;
use crate::DbError;

pub struct UnitOfWork {
    session: Session,
    users: OnceLock<UserRepository>,
    posts: OnceLock<PostRepository>,
    comments: OnceLock<CommentRepository>,
    pipeline_runs: OnceLock<PipelineRunRepository>,
}

impl UnitOfWork {
    /// Open a transaction on `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a connection cannot be acquired or the
    /// transaction cannot start.
    pub async fn begin(pool: &SqlitePool) -> Result<Self, DbError> {
        let session = Session::begin(pool).await?;
        Ok(Self {
            session,
            users: OnceLock::new(),
            posts: OnceLock::new(),
            comments: OnceLock::new(),
            pipeline_runs: OnceLock::new(),
        })
    }

    /// Created on first access; later calls return the same repository.
    pub fn users(&self) -> &UserRepository {
        self.users.get_or_init(|| Repository::new(self.session.clone()))
    }

    pub fn posts(&self) -> &PostRepository {
        self.posts.get_or_init(|| Repository::new(self.session.clone()))
    }

    pub fn comments(&self) -> &CommentRepository {
        self.comments.get_or_init(|| Repository::new(self.session.clone()))
    }

    pub fn pipeline_runs(&self) -> &PipelineRunRepository {
        self.pipeline_runs.get_or_init(|| Repository::new(self.session.clone()))
    }

    /// Make every change made through this unit of work durable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the commit fails, in which case the transaction
    /// is rolled back.
    pub async fn commit(self) -> Result<(), DbError> {
        if let Err(e) = self.session.commit().await {
            tracing::error!(error = %e, "unit of work commit failed; changes rolled back");
            return Err(e);
        }
        Ok(())
    }

    /// Discard every change made through this unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the rollback statement fails.
    pub async fn rollback(self) -> Result<(), DbError> {
        self.session.rollback().await
    }

    pub(crate) async fn lock_session(&self) -> SessionGuard<'_> {
        self.session.lock().await
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.session.is_open() {
            tracing::debug!("unit of work dropped without commit; rolling back");
        }
    }
}

/// Run `f` inside a fresh unit of work, committing when it returns `Ok` and
/// rolling back when it returns `Err`. The closure's error is returned
/// unchanged.
///
/// ```ignore
/// let user = transaction(&pool, |uow| Box::pin(async move {
///     uow.users().add(&user).await
/// })).await?;
/// ```
///
/// # Errors
///
/// Returns the closure's error, or the [`DbError`] from starting or
/// committing the transaction.
pub async fn transaction<T, E, F>(pool: &SqlitePool, f: F) -> Result<T, E>
where
    F: for<'u> FnOnce(&'u UnitOfWork) -> BoxFuture<'u, Result<T, E>>,
    E: From<DbError>,
{
    let uow = UnitOfWork::begin(pool).await?;
    let outcome = f(&uow).await;
    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(
                    error = %rollback_err,
                    "rollback after failed unit of work did not complete"
                );
            }
            Err(err)
        }
    }
}
