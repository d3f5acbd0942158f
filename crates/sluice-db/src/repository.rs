//! Generic CRUD over one entity table, bound to a unit of work's session.
//!
//! Each table supplies an [`EntityMapping`] describing its columns, its SQL,
//! and how to move values between the domain entity and the decoded row.
//! [`Repository`] turns that into `add`/`get`/`get_all`/`update`/`delete`.

use std::marker::PhantomData;

use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteRow;
use sqlx::{Database, FromRow, Sqlite};

use crate::session::Session;
use crate::DbError;

/// A `query_as` against `SQLite` producing rows of type `R`.
pub type RowQuery<'q, R> = QueryAs<'q, Sqlite, R, <Sqlite as Database>::Arguments<'q>>;

pub trait EntityMapping: Send + Sync + 'static {
    type Entity: Send + Sync;
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;

    const TABLE: &'static str;
    /// Column list used by every `SELECT` and `RETURNING` clause.
    const COLUMNS: &'static str;
    /// Insert-or-replace keyed on `id`, returning the stored row. Parameters
    /// are numbered so the same [`EntityMapping::bind`] serves both statements.
    const UPSERT_SQL: &'static str;
    /// Full-field overwrite of the row whose id is `?1`, returning it.
    const UPDATE_SQL: &'static str;

    /// `None` for entities that storage has not assigned an id yet.
    fn id(entity: &Self::Entity) -> Option<i64>;

    fn bind<'q>(
        query: RowQuery<'q, Self::Row>,
        entity: &'q Self::Entity,
    ) -> RowQuery<'q, Self::Row>;

    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a stored value has no domain equivalent.
    fn into_entity(row: Self::Row) -> Result<Self::Entity, DbError>;
}

pub struct Repository<M: EntityMapping> {
    session: Session,
    _mapping: PhantomData<fn() -> M>,
}

impl<M: EntityMapping> Repository<M> {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            _mapping: PhantomData,
        }
    }

    /// Insert the entity, or overwrite the stored row with the same id.
    /// Returns the entity as stored, including a storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if a unique column collides with a
    /// different row, or [`DbError::SessionClosed`] after commit/rollback.
    pub async fn add(&self, entity: &M::Entity) -> Result<M::Entity, DbError> {
        let query = M::bind(sqlx::query_as(M::UPSERT_SQL), entity);
        let row = {
            let mut guard = self.session.lock().await;
            let conn = guard.as_deref_mut().ok_or(DbError::SessionClosed)?;
            query.fetch_one(conn).await?
        };
        M::into_entity(row)
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get(&self, id: i64) -> Result<Option<M::Entity>, DbError> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", M::COLUMNS, M::TABLE);
        self.fetch_optional(sqlx::query_as(&sql).bind(id)).await
    }

    /// All rows in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_all(&self) -> Result<Vec<M::Entity>, DbError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", M::COLUMNS, M::TABLE);
        self.fetch_all(sqlx::query_as(&sql)).await
    }

    /// Overwrite every field of the row matching the entity's id.
    ///
    /// When the entity has no id or no such row exists nothing is written and
    /// the input is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    pub async fn update(&self, entity: M::Entity) -> Result<M::Entity, DbError> {
        if M::id(&entity).is_none() {
            return Ok(entity);
        }
        let updated = {
            let query = M::bind(sqlx::query_as(M::UPDATE_SQL), &entity);
            self.fetch_optional(query).await?
        };
        Ok(updated.unwrap_or(entity))
    }

    /// Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the statement fails.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", M::TABLE);
        let mut guard = self.session.lock().await;
        let conn = guard.as_deref_mut().ok_or(DbError::SessionClosed)?;
        let result = sqlx::query(&sql).bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn fetch_optional(
        &self,
        query: RowQuery<'_, M::Row>,
    ) -> Result<Option<M::Entity>, DbError> {
        let row = {
            let mut guard = self.session.lock().await;
            let conn = guard.as_deref_mut().ok_or(DbError::SessionClosed)?;
            query.fetch_optional(conn).await?
        };
        row.map(M::into_entity).transpose()
    }

    pub(crate) async fn fetch_all(
        &self,
        query: RowQuery<'_, M::Row>,
    ) -> Result<Vec<M::Entity>, DbError> {
        let rows = {
            let mut guard = self.session.lock().await;
            let conn = guard.as_deref_mut().ok_or(DbError::SessionClosed)?;
            query.fetch_all(conn).await?
        };
        rows.into_iter().map(M::into_entity).collect()
    }
}
