//! Storage mapping and lookups for the `posts` table.

use chrono::{DateTime, Utc};
use sluice_core::Post;

use crate::repository::{EntityMapping, Repository, RowQuery};
use crate::DbError;

pub type PostRepository = Repository<PostMapping>;

const POST_COLUMNS: &str = "id, user_id, title, body, created_at";

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    /// Not constrained to an existing user.
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub struct PostMapping;

impl EntityMapping for PostMapping {
    type Entity = Post;
    type Row = PostRow;

    const TABLE: &'static str = "posts";
    const COLUMNS: &'static str = POST_COLUMNS;

    const UPSERT_SQL: &'static str = "INSERT INTO posts (id, user_id, title, body, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (id) DO UPDATE SET \
             user_id = excluded.user_id, \
             title = excluded.title, \
             body = excluded.body \
         RETURNING id, user_id, title, body, created_at";

    const UPDATE_SQL: &'static str = "UPDATE posts SET \
             user_id = ?2, title = ?3, body = ?4, created_at = ?5 \
         WHERE id = ?1 \
         RETURNING id, user_id, title, body, created_at";

    fn id(entity: &Post) -> Option<i64> {
        Some(entity.id)
    }

    fn bind<'q>(query: RowQuery<'q, PostRow>, post: &'q Post) -> RowQuery<'q, PostRow> {
        query
            .bind(post.id)
            .bind(post.user_id)
            .bind(post.title.as_str())
            .bind(post.body.as_str())
            .bind(post.created_at)
    }

    fn into_entity(row: PostRow) -> Result<Post, DbError> {
        Ok(Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

impl Repository<PostMapping> {
    /// Posts written by `user_id`, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_by_user_id(&self, user_id: i64) -> Result<Vec<Post>, DbError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY id");
        self.fetch_all(sqlx::query_as(&sql).bind(user_id)).await
    }
}
