//! Record-level cleaning of raw API payloads into entities.
//!
//! Each raw record either becomes one entity or is skipped with a warning;
//! a bad record never fails the batch.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sluice_core::{Address, Comment, Company, Geo, Post, RunMetadata, User};
use sluice_extract::{RawRecord, RawSnapshot, Resource};
use thiserror::Error;

/// Why a single raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Cleaned output of one transform step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanBatch {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

impl CleanBatch {
    #[must_use]
    pub fn total(&self) -> usize {
        self.users.len() + self.posts.len() + self.comments.len()
    }

    /// Per-type counts recorded on a successful run.
    #[must_use]
    pub fn metadata(&self) -> RunMetadata {
        let mut metadata = RunMetadata::new();
        metadata.insert("users_processed".to_owned(), self.users.len().into());
        metadata.insert("posts_processed".to_owned(), self.posts.len().into());
        metadata.insert("comments_processed".to_owned(), self.comments.len().into());
        metadata
    }
}

// ---------------------------------------------------------------------------
// Field cleaners
// ---------------------------------------------------------------------------

/// Collapse every run of whitespace (including line breaks) to one space and
/// trim the ends.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip common phone formatting: spaces, dashes, dots, and parentheses.
#[must_use]
pub fn clean_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Lower-case the URL and default its scheme to `http://`.
#[must_use]
pub fn clean_website(website: &str) -> String {
    let website = website.trim().to_lowercase();
    if website.is_empty() || website.starts_with("http://") || website.starts_with("https://") {
        website
    } else {
        format!("http://{website}")
    }
}

#[must_use]
pub fn clean_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Record transforms
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`TransformError`] when `raw` is not an object, or `id`,
/// `username`, or `email` is missing or malformed.
pub fn transform_user(raw: &RawRecord, now: DateTime<Utc>) -> Result<User, TransformError> {
    let obj = as_object(raw)?;
    let username = optional_str(obj, "username")?.trim().to_owned();
    if username.is_empty() {
        return Err(TransformError::MissingField("username"));
    }
    let email = clean_email(optional_str(obj, "email")?);
    if email.is_empty() {
        return Err(TransformError::MissingField("email"));
    }

    Ok(User {
        id: required_id(obj, "id")?,
        name: optional_str(obj, "name")?.trim().to_owned(),
        username,
        email,
        phone: clean_phone(optional_str(obj, "phone")?),
        website: clean_website(optional_str(obj, "website")?),
        address: transform_address(obj.get("address"))?,
        company: transform_company(obj.get("company"))?,
        created_at: now,
    })
}

/// # Errors
///
/// Returns [`TransformError`] when `raw` is not an object or `id`/`userId`
/// is missing or not an integer.
pub fn transform_post(raw: &RawRecord, now: DateTime<Utc>) -> Result<Post, TransformError> {
    let obj = as_object(raw)?;
    Ok(Post {
        id: required_id(obj, "id")?,
        user_id: required_id(obj, "userId")?,
        title: clean_text(optional_str(obj, "title")?),
        body: clean_text(optional_str(obj, "body")?),
        created_at: now,
    })
}

/// # Errors
///
/// Returns [`TransformError`] when `raw` is not an object or `id`/`postId`
/// is missing or not an integer.
pub fn transform_comment(raw: &RawRecord, now: DateTime<Utc>) -> Result<Comment, TransformError> {
    let obj = as_object(raw)?;
    Ok(Comment {
        id: required_id(obj, "id")?,
        post_id: required_id(obj, "postId")?,
        name: clean_text(optional_str(obj, "name")?),
        email: clean_email(optional_str(obj, "email")?),
        body: clean_text(optional_str(obj, "body")?),
        created_at: now,
    })
}

#[must_use]
pub fn transform_users(raw: &[RawRecord], now: DateTime<Utc>) -> Vec<User> {
    transform_each(Resource::Users, raw, |r| transform_user(r, now))
}

#[must_use]
pub fn transform_posts(raw: &[RawRecord], now: DateTime<Utc>) -> Vec<Post> {
    transform_each(Resource::Posts, raw, |r| transform_post(r, now))
}

#[must_use]
pub fn transform_comments(raw: &[RawRecord], now: DateTime<Utc>) -> Vec<Comment> {
    transform_each(Resource::Comments, raw, |r| transform_comment(r, now))
}

/// Clean all three collections, stamping every entity with `now`.
#[must_use]
pub fn transform_snapshot(snapshot: &RawSnapshot, now: DateTime<Utc>) -> CleanBatch {
    CleanBatch {
        users: transform_users(&snapshot.users, now),
        posts: transform_posts(&snapshot.posts, now),
        comments: transform_comments(&snapshot.comments, now),
    }
}

fn transform_each<T>(
    resource: Resource,
    raw: &[RawRecord],
    transform: impl Fn(&RawRecord) -> Result<T, TransformError>,
) -> Vec<T> {
    let cleaned: Vec<T> = raw
        .iter()
        .filter_map(|record| match transform(record) {
            Ok(entity) => Some(entity),
            Err(e) => {
                let record_id = record.get("id").unwrap_or(&Value::Null);
                tracing::warn!(
                    %resource,
                    %record_id,
                    error = %e,
                    "skipping malformed record"
                );
                None
            }
        })
        .collect();

    tracing::info!(
        %resource,
        received = raw.len(),
        cleaned = cleaned.len(),
        "transformed records"
    );
    cleaned
}

fn transform_address(value: Option<&Value>) -> Result<Address, TransformError> {
    let Some(obj) = nested_object(value, "address")? else {
        return Ok(Address::default());
    };

    let geo = match obj.get("geo") {
        None | Some(Value::Null) => None,
        Some(Value::Object(geo)) if geo.is_empty() => None,
        Some(Value::Object(geo)) => Some(parse_geo(geo)),
        Some(_) => Some(Geo::default()),
    };

    Ok(Address {
        street: optional_str(obj, "street")?.trim().to_owned(),
        suite: optional_str(obj, "suite")?.trim().to_owned(),
        city: optional_str(obj, "city")?.trim().to_owned(),
        zipcode: optional_str(obj, "zipcode")?.trim().to_owned(),
        geo,
    })
}

/// Both coordinates fall back to `0.0` when either one is unparseable.
fn parse_geo(geo: &Map<String, Value>) -> Geo {
    let coordinate = |key: &str| -> Option<f64> {
        match geo.get(key) {
            None | Some(Value::Null) => Some(0.0),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        }
    };
    match (coordinate("lat"), coordinate("lng")) {
        (Some(lat), Some(lng)) => Geo { lat, lng },
        _ => Geo::default(),
    }
}

fn transform_company(value: Option<&Value>) -> Result<Company, TransformError> {
    let Some(obj) = nested_object(value, "company")? else {
        return Ok(Company::default());
    };
    Ok(Company {
        name: optional_str(obj, "name")?.trim().to_owned(),
        catch_phrase: optional_str(obj, "catchPhrase")?.trim().to_owned(),
        bs: optional_str(obj, "bs")?.trim().to_owned(),
    })
}

// ---------------------------------------------------------------------------
// JSON accessors
// ---------------------------------------------------------------------------

fn as_object(raw: &RawRecord) -> Result<&Map<String, Value>, TransformError> {
    raw.as_object().ok_or(TransformError::NotAnObject)
}

fn nested_object<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<Option<&'a Map<String, Value>>, TransformError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(obj)) => Ok(Some(obj)),
        Some(_) => Err(TransformError::InvalidField {
            field,
            reason: "expected an object".to_owned(),
        }),
    }
}

fn required_id(obj: &Map<String, Value>, field: &'static str) -> Result<i64, TransformError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(TransformError::MissingField(field)),
        Some(value) => value.as_i64().ok_or_else(|| TransformError::InvalidField {
            field,
            reason: format!("expected an integer, got {value}"),
        }),
    }
}

/// Missing or null strings read as `""`.
fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, TransformError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(TransformError::InvalidField {
            field,
            reason: "expected a string".to_owned(),
        }),
    }
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
