use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::DomainError;

/// One of the two fixed participants. Identity is self-declared, there is no
/// registration and no secret.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum User {
    Yadish,
    Rini,
}

impl User {
    pub const ALL: [User; 2] = [User::Yadish, User::Rini];

    /// Active user on a profile that has never switched.
    pub const BOOTSTRAP: User = User::Yadish;

    pub fn name(&self) -> &'static str {
        match self {
            User::Yadish => "Yadish",
            User::Rini => "Rini",
        }
    }

    pub fn other(&self) -> User {
        match self {
            User::Yadish => User::Rini,
            User::Rini => User::Yadish,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        User::BOOTSTRAP
    }
}

impl Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for User {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        User::ALL
            .into_iter()
            .find(|u| u.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownUser(s.to_owned()))
    }
}
