//! Scoped neutralization of process environment variables
//!
//! The base-object generator substitutes certain environment variables into
//! its output. [`EnvGuard`] blanks them for the duration of a call and puts
//! the previous values back when dropped, on every exit path.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::trace;

/// Serializes every guarded section in the process
///
/// Reentrant so a thread already holding it can open a nested guard.
static ENV_LOCK: ReentrantMutex<()> = ReentrantMutex::new(());

/// Holds a set of environment variables blank until dropped
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: ReentrantMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Blank each of `names`, remembering what was there
    ///
    /// Blocks while another thread holds a guard.
    pub fn neutralize(names: &[&str]) -> Self {
        let lock = ENV_LOCK.lock();
        let saved = names
            .iter()
            .map(|name| {
                let previous = std::env::var(name).ok();
                std::env::set_var(name, "");
                trace!(name, had_value = previous.is_some(), "neutralized environment variable");
                (name.to_string(), previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

/// Hold the environment lock without touching any variable
#[cfg(test)]
pub(crate) fn lock_environment() -> ReentrantMutexGuard<'static, ()> {
    ENV_LOCK.lock()
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }
}
