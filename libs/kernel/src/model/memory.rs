use serde::{Deserialize, Serialize};

use super::{CommentId, MemoryId, Millis, User, VersionId, UNTITLED};

/// A titled rich-text document. Only its author may change it, and its
/// version history only ever grows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: MemoryId,
    pub title: String,
    pub content: String,
    pub author: User,
    pub created_at: Millis,
    pub updated_at: Millis,
    pub versions: Vec<MemoryVersion>,
}

impl Memory {
    pub fn is_owned_by(&self, user: User) -> bool {
        self.author == user
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    pub fn find_version(&self, id: &VersionId) -> Option<&MemoryVersion> {
        self.versions.iter().find(|v| &v.id == id)
    }

    pub fn latest_version(&self) -> Option<&MemoryVersion> {
        self.versions.last()
    }

    /// Versions newest first, the order history is browsed in.
    pub fn history(&self) -> impl Iterator<Item = &MemoryVersion> {
        self.versions.iter().rev()
    }
}

/// Whole-document snapshot, never modified once taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryVersion {
    pub id: VersionId,
    pub content: String,
    pub saved_at: Millis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub memory_id: MemoryId,
    pub author: User,
    pub text: String,
    pub created_at: Millis,
}
