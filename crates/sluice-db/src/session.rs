//! Shared handle on the single transaction owned by a unit of work.

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use crate::DbError;

pub(crate) type SessionGuard<'a> = MutexGuard<'a, Option<Transaction<'static, Sqlite>>>;

/// Cloneable handle on one open transaction. Every repository created by a
/// unit of work holds a clone, so all of their reads and writes go through
/// the same connection. The slot is emptied on commit or rollback; any use
/// after that fails with [`DbError::SessionClosed`].
#[derive(Clone)]
pub(crate) struct Session {
    tx: Arc<Mutex<Option<Transaction<'static, Sqlite>>>>,
}

impl Session {
    pub(crate) async fn begin(pool: &SqlitePool) -> Result<Self, DbError> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        })
    }

    pub(crate) async fn lock(&self) -> SessionGuard<'_> {
        self.tx.lock().await
    }

    pub(crate) async fn commit(&self) -> Result<(), DbError> {
        let tx = self.tx.lock().await.take().ok_or(DbError::SessionClosed)?;
        // A failed commit drops `tx`, which rolls the transaction back.
        tx.commit().await?;
        Ok(())
    }

    pub(crate) async fn rollback(&self) -> Result<(), DbError> {
        let tx = self.tx.lock().await.take().ok_or(DbError::SessionClosed)?;
        tx.rollback().await?;
        Ok(())
    }

    /// `true` while the transaction has been neither committed nor rolled
    /// back. A session that is locked by an in-flight query counts as open.
    pub(crate) fn is_open(&self) -> bool {
        self.tx.try_lock().map_or(true, |guard| guard.is_some())
    }
}
