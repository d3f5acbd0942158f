use std::fmt;

use serde::{Deserialize, Serialize};

/// One record exactly as the API returned it.
pub type RawRecord = serde_json::Value;

/// The three collections the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Users,
    Posts,
    Comments,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Users, Resource::Posts, Resource::Comments];

    /// Path relative to the API base URL.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Posts => "posts",
            Resource::Comments => "comments",
        }
    }

    /// Name used in archive file names and log fields.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.path()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything fetched by one extraction step, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub users: Vec<RawRecord>,
    pub posts: Vec<RawRecord>,
    pub comments: Vec<RawRecord>,
}

impl RawSnapshot {
    #[must_use]
    pub fn records(&self, resource: Resource) -> &[RawRecord] {
        match resource {
            Resource::Users => &self.users,
            Resource::Posts => &self.posts,
            Resource::Comments => &self.comments,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.users.len() + self.posts.len() + self.comments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_paths_match_api_routes() {
        let paths: Vec<&str> = Resource::ALL.iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["users", "posts", "comments"]);
    }

    #[test]
    fn snapshot_selects_records_by_resource() {
        let snapshot = RawSnapshot {
            users: vec![json!({"id": 1})],
            posts: vec![json!({"id": 1}), json!({"id": 2})],
            comments: Vec::new(),
        };
        assert_eq!(snapshot.records(Resource::Posts).len(), 2);
        assert!(snapshot.records(Resource::Comments).is_empty());
        assert_eq!(snapshot.total(), 3);
    }
}
