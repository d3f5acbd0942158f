//! Storage mapping and lookups for the `users` table.

use chrono::{DateTime, Utc};
use sluice_core::{Address, Company, User};
use sqlx::types::Json;

use crate::repository::{EntityMapping, Repository, RowQuery};
use crate::DbError;

pub type UserRepository = Repository<UserMapping>;

const USER_COLUMNS: &str =
    "id, name, username, email, phone, website, address, company, created_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `users` table. `address` and `company` are stored as JSON
/// text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: Json<Address>,
    pub company: Json<Company>,
    pub created_at: DateTime<Utc>,
}

pub struct UserMapping;

impl EntityMapping for UserMapping {
    type Entity = User;
    type Row = UserRow;

    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = USER_COLUMNS;

    // `created_at` keeps the time the user was first stored.
    const UPSERT_SQL: &'static str = "INSERT INTO users \
         (id, name, username, email, phone, website, address, company, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
         ON CONFLICT (id) DO UPDATE SET \
             name = excluded.name, \
             username = excluded.username, \
             email = excluded.email, \
             phone = excluded.phone, \
             website = excluded.website, \
             address = excluded.address, \
             company = excluded.company \
         RETURNING id, name, username, email, phone, website, address, company, created_at";

    const UPDATE_SQL: &'static str = "UPDATE users SET \
             name = ?2, username = ?3, email = ?4, phone = ?5, website = ?6, \
             address = ?7, company = ?8, created_at = ?9 \
         WHERE id = ?1 \
         RETURNING id, name, username, email, phone, website, address, company, created_at";

    fn id(entity: &User) -> Option<i64> {
        Some(entity.id)
    }

    fn bind<'q>(query: RowQuery<'q, UserRow>, user: &'q User) -> RowQuery<'q, UserRow> {
        query
            .bind(user.id)
            .bind(user.name.as_str())
            .bind(user.username.as_str())
            .bind(user.email.as_str())
            .bind(user.phone.as_str())
            .bind(user.website.as_str())
            .bind(Json(&user.address))
            .bind(Json(&user.company))
            .bind(user.created_at)
    }

    fn into_entity(row: UserRow) -> Result<User, DbError> {
        Ok(User {
            id: row.id,
            name: row.name,
            username: row.username,
            email: row.email,
            phone: row.phone,
            website: row.website,
            address: row.address.0,
            company: row.company.0,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl Repository<UserMapping> {
    /// Exact match on the stored (lower-cased) email.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        self.fetch_optional(sqlx::query_as(&sql).bind(email)).await
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        self.fetch_optional(sqlx::query_as(&sql).bind(username)).await
    }
}
