//! Cleaned entity records as they are stored and served.
//!
//! Ids for users, posts, and comments are assigned by the upstream API and
//! are stable across runs, so reprocessing the same id replaces the stored
//! row rather than adding a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Unique across all users.
    pub username: String,
    /// Lower-cased; unique across all users.
    pub email: String,
    /// Formatting characters stripped, e.g. `"1-770-736-8031 x56442"` →
    /// `"17707368031x56442"`.
    pub phone: String,
    /// Always carries a scheme when non-empty.
    pub website: String,
    pub address: Address,
    pub company: Company,
    /// Set when the record was cleaned, not when it was extracted.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: f64,
    pub lng: f64,
}

/// Employer details. Field names on the wire follow the upstream API
/// (`catchPhrase`, `bs`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub name: String,
    #[serde(rename = "catchPhrase")]
    pub catch_phrase: String,
    pub bs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Author id. Not checked against `users` when stored.
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Parent post id. Not checked against `posts` when stored.
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
