use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a spawned [task].
///
/// Every call to a spawn function allocates a fresh ID before it tries to
/// create the task's thread, so a task whose thread was never created still
/// has one (reported by its [`SpawnError`]). IDs are never handed out twice
/// in the same process.
///
/// IDs are retrieved with [`Handle::id`] and [`Io::id`], and are returned by
/// [`spawn_detached`].
///
/// [task]: crate::task
/// [`Handle::id`]: crate::task::Handle::id
/// [`Io::id`]: crate::task::Io::id
/// [`spawn_detached`]: crate::task::spawn_detached
/// [`SpawnError`]: crate::task::SpawnError
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Always a std atomic: loom's can't live in a `static`.
static NEXT: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    pub(crate) fn next() -> Self {
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        debug_assert_ne!(id, 0, "task ID counter wrapped around");
        Self(id)
    }

    /// Returns the ID's numeric value.
    #[must_use]
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskId").field(&self.0).finish()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
        assert!(b > a, "task IDs are allocated in increasing order");
        assert_eq!(u64::from(a), a.as_u64());
        assert_eq!(format!("{a:?}"), format!("TaskId({a})"));
    }
}
