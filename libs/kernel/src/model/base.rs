use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use thiserror::Error;

use super::User;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

pub static UNTITLED: &str = "Untitled Memory";

macro_rules! key_type {
    ($name:ident) => {
        #[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: &str) -> $name {
                $name(s.to_string())
            }

            pub fn from_string(s: String) -> $name {
                $name(s)
            }

            pub fn key_to_string(&self) -> &str {
                &self.0
            }

            pub fn valid(&self) -> bool {
                !self.0.is_empty()
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "`{}`", self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

key_type!(MemoryId);
key_type!(VersionId);
key_type!(CommentId);

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Memory {memory} belongs to {author}, {active} may only read it")]
    ReadOnly {
        memory: MemoryId,
        author: User,
        active: User,
    },
    #[error("Unknown user '{0}'")]
    UnknownUser(String),
    #[error("Comment text is empty")]
    EmptyComment,
    #[error("No such version {1} on memory {0}")]
    NoSuchVersion(MemoryId, VersionId),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
