use super::TaskId;
use crate::sync::Slot;
use core::{any::Any, fmt};
use std::{io, sync::Arc, thread};

/// An owned permission to join a [task] (wait for it to terminate and take
/// its output).
///
/// This is similar to the standard library's [`std::thread::JoinHandle`],
/// except that joining is *memoized*: the first call to [`join`] blocks until
/// the task's thread has terminated, and caches the outcome. Every later call
/// returns the cached outcome immediately, without touching the thread
/// again. A `Handle` performs at most one OS-level join, but can be queried
/// for its result any number of times.
///
/// Spawning never fails outright: a `Handle` is returned even if the task's
/// thread could not be created. [`spawn_status`] reports whether it was, and
/// joining a handle whose thread was never created returns
/// [`JoinError::NotSpawned`] immediately.
///
/// Dropping a `Handle` without joining it *detaches* the task's thread. The
/// task keeps running, but its output can no longer be retrieved.
///
/// [task]: crate::task
/// [`join`]: Self::join
/// [`spawn_status`]: Self::spawn_status
/// [`std::thread::JoinHandle`]: https://doc.rust-lang.org/stable/std/thread/struct.JoinHandle.html
pub struct Handle<R> {
    id: TaskId,
    output: Arc<Slot<R>>,
    thread: Option<thread::JoinHandle<()>>,
    spawn_status: Result<(), SpawnError>,
    /// `None` until the handle has been joined.
    join_status: Option<Result<(), JoinError>>,
}

/// Errors returned when a task's thread could not be created.
#[derive(Debug, thiserror::Error)]
#[error("failed to spawn a thread for task {id}")]
pub struct SpawnError {
    id: TaskId,
    #[source]
    source: io::Error,
}

/// Errors returned by joining a [`Handle`].
///
/// A `JoinError` is cached by the handle the first time it is joined, and
/// returned again by every later join.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum JoinError {
    /// The task's thread was never created, so there is nothing to join.
    ///
    /// The reason is reported by [`Handle::spawn_status`].
    #[error("task {id} was never spawned")]
    NotSpawned {
        /// The ID of the task.
        id: TaskId,
    },

    /// The task's thread panicked.
    #[error("task {id} panicked: {message}")]
    Panicked {
        /// The ID of the task.
        id: TaskId,
        /// `true` if the task published its output before panicking.
        ///
        /// If this is `true`, the output can still be read with
        /// [`Handle::try_output`].
        completed: bool,
        /// The panic message, if the panic payload was a string.
        message: String,
    },

    /// The handle was joined from the task's own thread, which would wait
    /// forever.
    #[error("task {id} cannot join itself")]
    Deadlock {
        /// The ID of the task.
        id: TaskId,
    },

    /// The task's thread terminated without the task publishing its output.
    ///
    /// Every task body has to return a [`Completed`](crate::Completed), so
    /// this only happens if a body returns a token that belongs to some
    /// other task. Debug builds catch that with an assertion on the task's
    /// thread, and report [`JoinError::Panicked`] instead.
    #[error("task {id} terminated without completing")]
    Incomplete {
        /// The ID of the task.
        id: TaskId,
    },
}

// === impl Handle ===

impl<R> Handle<R> {
    pub(super) fn spawned(
        id: TaskId,
        thread: thread::JoinHandle<()>,
        output: Arc<Slot<R>>,
    ) -> Self {
        Self {
            id,
            output,
            thread: Some(thread),
            spawn_status: Ok(()),
            join_status: None,
        }
    }

    pub(super) fn failed(error: SpawnError, output: Arc<Slot<R>>) -> Self {
        Self {
            id: error.id,
            output,
            thread: None,
            spawn_status: Err(error),
            join_status: None,
        }
    }

    /// Returns a [`TaskId`] that uniquely identifies this [task].
    ///
    /// [task]: crate::task
    #[must_use]
    #[inline]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns whether the task's thread was created.
    ///
    /// If this returns an error, no thread is running the task, and the task
    /// will never complete.
    pub fn spawn_status(&self) -> Result<(), &SpawnError> {
        match self.spawn_status {
            Ok(()) => Ok(()),
            Err(ref error) => Err(error),
        }
    }

    /// Returns `true` if the task has completed and published its output.
    ///
    /// This never blocks. Once it returns `true`, [`try_output`] returns the
    /// task's output.
    ///
    /// [`try_output`]: Self::try_output
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.output.is_ready()
    }

    /// Returns `true` if this handle has been joined.
    #[inline]
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.join_status.is_some()
    }

    /// Borrow the task's output, if it has completed, without blocking.
    #[inline]
    #[must_use]
    pub fn try_output(&self) -> Option<&R> {
        self.output.get()
    }

    /// Join the task, returning a reference to its output.
    ///
    /// The first call blocks until the task's thread has terminated, and
    /// records the outcome. Every call, including the first, returns the
    /// recorded outcome; calls after the first never block.
    ///
    /// # Errors
    ///
    /// - [`JoinError::NotSpawned`] if the task's thread was never created.
    ///   This returns immediately.
    /// - [`JoinError::Panicked`] if the task's thread panicked.
    /// - [`JoinError::Deadlock`] if this is called from the task's own
    ///   thread.
    /// - [`JoinError::Incomplete`] if the task's thread terminated without
    ///   publishing an output.
    pub fn join(&mut self) -> Result<&R, &JoinError> {
        if self.join_status.is_none() {
            let status = self.wait();
            self.join_status = Some(status);
        }

        match self.join_status {
            Some(Err(ref error)) => Err(error),
            Some(Ok(())) => match self.output.get() {
                Some(output) => Ok(output),
                None => unreachable!(
                    "task {} joined successfully, but its output is missing. this is a bug!",
                    self.id
                ),
            },
            None => unreachable!("join status was just recorded"),
        }
    }

    /// Join the task, returning only whether joining succeeded.
    ///
    /// Like [`join`](Self::join), this blocks only the first time the handle
    /// is joined.
    pub fn join_status(&mut self) -> Result<(), &JoinError> {
        self.join().map(|_| ())
    }

    /// Join the task and take ownership of its output.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`join`](Self::join).
    pub fn into_output(mut self) -> Result<R, JoinError> {
        if let Err(error) = self.join_status() {
            return Err(error.clone());
        }

        // the task's thread has terminated, so it no longer holds a
        // reference to the slot.
        Arc::get_mut(&mut self.output)
            .and_then(Slot::take)
            .ok_or(JoinError::Incomplete { id: self.id })
    }

    /// Wait for the task's thread to terminate.
    ///
    /// This consumes the thread's `JoinHandle`, so it can only actually wait
    /// once.
    fn wait(&mut self) -> Result<(), JoinError> {
        let id = self.id;
        let Some(thread) = self.thread.take() else {
            tracing::debug!(task.id = %id, "can't join a task that was never spawned");
            return Err(JoinError::NotSpawned { id });
        };

        if thread.thread().id() == thread::current().id() {
            tracing::debug!(task.id = %id, "a task tried to join itself");
            return Err(JoinError::Deadlock { id });
        }

        let _span = tracing::debug_span!("join", task.id = %id).entered();
        test_trace!("waiting for task thread to terminate");
        let status = match thread.join() {
            Ok(()) if self.output.is_ready() => Ok(()),
            Ok(()) => Err(JoinError::Incomplete { id }),
            Err(payload) => Err(JoinError::Panicked {
                id,
                completed: self.output.is_ready(),
                message: panic_message(payload.as_ref()),
            }),
        };
        tracing::debug!(?status, "joined task");
        status
    }
}

impl<R> Drop for Handle<R> {
    fn drop(&mut self) {
        if self.thread.is_some() {
            tracing::debug!(
                task.id = %self.id,
                task.complete = self.output.is_ready(),
                "dropping a handle that was never joined; detaching its thread",
            );
        }
    }
}

impl<R> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("output", &core::any::type_name::<R>())
            .field("complete", &self.output.is_ready())
            .field("spawn_status", &self.spawn_status)
            .field("join_status", &self.join_status)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_owned();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    String::from("Box<dyn Any>")
}

// === impl SpawnError ===

impl SpawnError {
    pub(super) fn new(id: TaskId, source: io::Error) -> Self {
        Self { id, source }
    }

    /// Returns the [`TaskId`] of the task that could not be spawned.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the kind of the underlying I/O error.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Returns the OS error code reported by the platform, if there is one.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    /// Consumes the error, returning the underlying I/O error.
    #[must_use]
    pub fn into_io_error(self) -> io::Error {
        self.source
    }
}

// === impl JoinError ===

impl JoinError {
    /// Returns the [`TaskId`] of the task that failed to join.
    #[must_use]
    pub fn id(&self) -> TaskId {
        match *self {
            JoinError::NotSpawned { id }
            | JoinError::Panicked { id, .. }
            | JoinError::Deadlock { id }
            | JoinError::Incomplete { id } => id,
        }
    }

    /// Returns `true` if the task failed to join because it panicked.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, JoinError::Panicked { .. })
    }

    /// Returns `true` if the task published its output before failing.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, JoinError::Panicked { completed: true, .. })
    }
}
