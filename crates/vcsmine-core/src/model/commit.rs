use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Ident};

/// Commit - one mined revision with its change statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    id: Ident,

    /// Revision hash as reported by the version control system
    pub revision: String,

    /// Identity that authored the change, once identities are resolved
    pub author_id: Option<EntityId>,

    /// Branch the revision was first seen on
    pub branch_id: Option<EntityId>,

    pub committed_at: DateTime<Utc>,

    pub message: String,

    pub lines_added: i64,

    pub lines_removed: i64,
}

impl Commit {
    pub fn new(revision: impl Into<String>, committed_at: DateTime<Utc>) -> Self {
        Self {
            id: Ident::unset(),
            revision: revision.into(),
            author_id: None,
            branch_id: None,
            committed_at,
            message: String::new(),
            lines_added: 0,
            lines_removed: 0,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_churn(mut self, lines_added: i64, lines_removed: i64) -> Self {
        self.lines_added = lines_added;
        self.lines_removed = lines_removed;
        self
    }

    /// Total lines touched
    pub fn churn(&self) -> i64 {
        self.lines_added + self.lines_removed
    }
}

impl Entity for Commit {
    fn ident(&self) -> &Ident {
        &self.id
    }

    fn ident_mut(&mut self) -> &mut Ident {
        &mut self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_new_commit() {
        let commit = Commit::new("a1b2c3", at(1_700_000_000_000))
            .with_message("Fix parser")
            .with_churn(10, 4);
        assert_eq!(commit.revision, "a1b2c3");
        assert_eq!(commit.churn(), 14);
        assert!(commit.author_id.is_none());
        assert!(!commit.is_persisted());
    }

    #[test]
    fn test_deserialize_zero_id_is_unsaved() {
        let json = r#"{
            "id": 0,
            "revision": "deadbeef",
            "author_id": null,
            "branch_id": null,
            "committed_at": "2024-03-01T12:00:00Z",
            "message": "import",
            "lines_added": 1,
            "lines_removed": 0
        }"#;
        let commit: Commit = serde_json::from_str(json).unwrap();
        assert_eq!(commit.id(), None);
        assert_eq!(commit.raw_id(), crate::model::UNSET_ID);
    }
}
