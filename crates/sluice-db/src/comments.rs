//! Storage mapping and lookups for the `comments` table.

use chrono::{DateTime, Utc};
use sluice_core::Comment;

use crate::repository::{EntityMapping, Repository, RowQuery};
use crate::DbError;

pub type CommentRepository = Repository<CommentMapping>;

const COMMENT_COLUMNS: &str = "id, post_id, name, email, body, created_at";

/// A row from the `comments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub struct CommentMapping;

impl EntityMapping for CommentMapping {
    type Entity = Comment;
    type Row = CommentRow;

    const TABLE: &'static str = "comments";
    const COLUMNS: &'static str = COMMENT_COLUMNS;

    const UPSERT_SQL: &'static str = "INSERT INTO comments \
         (id, post_id, name, email, body, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (id) DO UPDATE SET \
             post_id = excluded.post_id, \
             name = excluded.name, \
             email = excluded.email, \
             body = excluded.body \
         RETURNING id, post_id, name, email, body, created_at";

    const UPDATE_SQL: &'static str = "UPDATE comments SET \
             post_id = ?2, name = ?3, email = ?4, body = ?5, created_at = ?6 \
         WHERE id = ?1 \
         RETURNING id, post_id, name, email, body, created_at";

    fn id(entity: &Comment) -> Option<i64> {
        Some(entity.id)
    }

    fn bind<'q>(query: RowQuery<'q, CommentRow>, comment: &'q Comment) -> RowQuery<'q, CommentRow> {
        query
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.name.as_str())
            .bind(comment.email.as_str())
            .bind(comment.body.as_str())
            .bind(comment.created_at)
    }

    fn into_entity(row: CommentRow) -> Result<Comment, DbError> {
        Ok(Comment {
            id: row.id,
            post_id: row.post_id,
            name: row.name,
            email: row.email,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

impl Repository<CommentMapping> {
    /// Comments on `post_id`, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_by_post_id(&self, post_id: i64) -> Result<Vec<Comment>, DbError> {
        let sql =
            format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ?1 ORDER BY id");
        self.fetch_all(sqlx::query_as(&sql).bind(post_id)).await
    }
}
