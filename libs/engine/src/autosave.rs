use std::time::Duration;
use tracing::*;

use kernel::{Memory, MemoryId, Millis, User};

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Longer intervals are clamped to this.
pub const MAXIMUM_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything the timer was armed against. A change to any of these tears
/// the timer down and sets it up again.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Dependencies {
    memory: MemoryId,
    updated_at: Millis,
    author: User,
    active: User,
}

impl Dependencies {
    fn of(memory: &Memory, active: User) -> Self {
        Self {
            memory: memory.id.clone(),
            updated_at: memory.updated_at,
            author: memory.author,
            active,
        }
    }

    fn owned(&self) -> bool {
        self.author == self.active
    }
}

#[derive(Debug)]
struct Armed {
    dependencies: Dependencies,
    due: Option<Millis>,
}

/// A fixed interval timer for autosaving an open memory, modelled as an
/// effect that restarts whenever the open record or the active user changes.
/// It only ever runs while the active user owns the record.
#[derive(Debug)]
pub struct AutosaveTimer {
    interval: Millis,
    armed: Option<Armed>,
}

impl AutosaveTimer {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.min(MAXIMUM_INTERVAL).as_millis();

        Self {
            interval: Millis::try_from(interval).unwrap_or(Millis::MAX).max(1),
            armed: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval.unsigned_abs())
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.armed, Some(Armed { due: Some(_), .. }))
    }

    /// Re-runs the effect against the current dependencies.
    pub fn sync(&mut self, memory: &Memory, active: User, now: Millis) {
        let dependencies = Dependencies::of(memory, active);

        if let Some(armed) = &self.armed {
            if armed.dependencies == dependencies {
                return;
            }
        }

        let due = if dependencies.owned() {
            trace!(memory = %dependencies.memory, %active, "autosave:start");
            Some(now.saturating_add(self.interval))
        } else {
            trace!(memory = %dependencies.memory, %active, "autosave:idle");
            None
        };

        self.armed = Some(Armed { dependencies, due });
    }

    pub fn cancel(&mut self) {
        if self.armed.take().is_some() {
            trace!("autosave:cancel");
        }
    }

    /// True when an interval has elapsed, at most once per call. The next
    /// tick is scheduled one interval after this one was due.
    pub fn poll(&mut self, now: Millis) -> bool {
        let Some(Armed { due: Some(due), .. }) = &mut self.armed else {
            return false;
        };

        if now < *due {
            return false;
        }

        let missed = now.saturating_sub(*due) / self.interval;
        *due = due.saturating_add(missed.saturating_add(1).saturating_mul(self.interval));

        true
    }
}

impl Default for AutosaveTimer {
    fn default() -> Self {
        Self::new(AUTOSAVE_INTERVAL)
    }
}
