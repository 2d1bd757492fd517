use anyhow::Result;
use std::{cell::Cell, rc::Rc};
use tracing::*;

use crate::{collection::CURRENT_USER_KEY, storage::Storage};
use kernel::User;

/// Who is acting right now. Switching is a self-declaration, not a login,
/// and the choice survives restarts.
///
/// This is passed to whatever needs to check permissions rather than
/// consulted globally, and every check reads it afresh.
pub struct SessionPolicy {
    storage: Rc<dyn Storage>,
    current: Cell<User>,
}

impl SessionPolicy {
    /// Resumes the remembered user, or the bootstrap user if there isn't a
    /// usable one.
    pub fn open(storage: Rc<dyn Storage>) -> Self {
        let current = remembered(storage.as_ref()).unwrap_or(User::BOOTSTRAP);

        debug!(%current, "session-policy:open");

        Self {
            storage,
            current: Cell::new(current),
        }
    }

    pub fn current(&self) -> User {
        self.current.get()
    }

    /// Takes effect immediately, even if remembering the choice fails.
    pub fn switch_to(&self, user: User) -> Result<()> {
        let previous = self.current.replace(user);

        info!(%previous, %user, "session-policy:switch");

        self.storage
            .set(CURRENT_USER_KEY, &serde_json::to_string(&user)?)
    }
}

fn remembered(storage: &dyn Storage) -> Option<User> {
    let serialized = match storage.get(CURRENT_USER_KEY) {
        Ok(serialized) => serialized?,
        Err(e) => {
            warn!(error = %e, "session-policy:unreadable");
            return None;
        }
    };

    // Older profiles hold the bare name rather than a JSON string.
    match serde_json::from_str(&serialized).or_else(|_| serialized.parse::<User>()) {
        Ok(user) => Some(user),
        Err(_) => {
            warn!(%serialized, "session-policy:unknown-user");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[test]
    fn it_defaults_to_bootstrap_user() {
        let policy = SessionPolicy::open(InMemoryStorage::new());

        assert_eq!(policy.current(), User::Yadish);
    }

    #[test]
    fn it_switches_immediately() -> Result<()> {
        let policy = SessionPolicy::open(InMemoryStorage::new());

        policy.switch_to(User::Rini)?;
        assert_eq!(policy.current(), User::Rini);

        policy.switch_to(User::Yadish)?;
        assert_eq!(policy.current(), User::Yadish);

        Ok(())
    }

    #[test]
    fn it_resumes_remembered_user() -> Result<()> {
        let storage = InMemoryStorage::new();

        SessionPolicy::open(storage.clone()).switch_to(User::Rini)?;

        assert_eq!(SessionPolicy::open(storage.clone()).current(), User::Rini);
        assert_eq!(
            storage.get(CURRENT_USER_KEY)?.as_deref(),
            Some(r#""Rini""#)
        );

        Ok(())
    }

    #[test]
    fn it_resumes_bare_remembered_names() -> Result<()> {
        let storage = InMemoryStorage::new();

        storage.set(CURRENT_USER_KEY, "Rini")?;

        assert_eq!(SessionPolicy::open(storage).current(), User::Rini);

        Ok(())
    }

    #[test]
    fn it_ignores_unknown_remembered_user() -> Result<()> {
        let storage = InMemoryStorage::new();

        storage.set(CURRENT_USER_KEY, r#""Mallory""#)?;

        assert_eq!(SessionPolicy::open(storage).current(), User::BOOTSTRAP);

        Ok(())
    }
}
