use super::{Completed, Completer, Handle, Io, SpawnError, TaskFn, TaskId};
use crate::sync::Slot;
use core::{any, panic::Location};
use std::{io, sync::Arc, thread};

/// Builds a new [task] prior to spawning it.
///
/// A `Builder` configures the thread a task runs on, and how the task is
/// described in `tracing` spans. The free functions [`spawn`],
/// [`spawn_fn`], [`spawn_detached`] and [`spawn_detached_fn`] use a
/// default `Builder`.
///
/// ```
/// use hyphae::Builder;
///
/// let mut handle = Builder::new()
///     .name("greeter")
///     .spawn_fn((), |io| {
///         let name = std::thread::current().name().map(String::from);
///         io.complete(name)
///     });
///
/// assert_eq!(handle.join(), Ok(&Some(String::from("greeter"))));
/// ```
///
/// [task]: crate::task
/// [`spawn`]: crate::task::spawn
/// [`spawn_fn`]: crate::task::spawn_fn
/// [`spawn_detached`]: crate::task::spawn_detached
/// [`spawn_detached_fn`]: crate::task::spawn_detached_fn
#[derive(Debug, Clone, Default)]
pub struct Builder<'a> {
    name: Option<&'a str>,
    kind: Option<&'static str>,
    stack_size: Option<usize>,
}

impl<'a> Builder<'a> {
    /// Returns a new `Builder` with the default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            kind: None,
            stack_size: None,
        }
    }

    /// Adds a name to the tasks produced by this builder.
    ///
    /// The name is used as the name of the task's thread, and is recorded as
    /// the `task.name` field of the task's `tracing` span.
    ///
    /// By default, tasks are unnamed.
    pub fn name(self, name: &'a str) -> Self {
        Self {
            name: Some(name),
            ..self
        }
    }

    /// Adds a static string which describes the type of the configured task.
    ///
    /// This is recorded as the `task.kind` field of the task's `tracing`
    /// span. By default, tasks spawned from a [`TaskFn`] have the `TaskFn`
    /// implementation's type name as their kind, and tasks spawned from a
    /// closure have the kind `"fn"`.
    pub fn kind(self, kind: &'static str) -> Self {
        Self {
            kind: Some(kind),
            ..self
        }
    }

    /// Sets the size of the stack (in bytes) for the task's thread.
    ///
    /// By default, the platform's default stack size for spawned threads is
    /// used. A stack size the platform can't provide makes spawning fail,
    /// which is reported by [`Handle::spawn_status`] (or by the `Err`
    /// returned from the detached spawn methods).
    pub fn stack_size(self, size: usize) -> Self {
        Self {
            stack_size: Some(size),
            ..self
        }
    }

    /// Spawns a task of kind `T` with this builder's configured settings.
    ///
    /// This returns a [`Handle`] immediately, whether or not the thread was
    /// created; check [`Handle::spawn_status`] to find out.
    #[inline]
    #[track_caller]
    pub fn spawn<T: TaskFn>(&self, args: T::Args) -> Handle<T::Output> {
        self.spawn_attached(args, T::run, any::type_name::<T>())
    }

    /// Spawns a task running `body` with this builder's configured settings.
    ///
    /// This returns a [`Handle`] immediately, whether or not the thread was
    /// created; check [`Handle::spawn_status`] to find out.
    #[inline]
    #[track_caller]
    pub fn spawn_fn<A, R, F>(&self, args: A, body: F) -> Handle<R>
    where
        F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
        A: Send + 'static,
        R: Send + Sync + 'static,
    {
        self.spawn_attached(args, body, "fn")
    }

    /// Spawns a detached task of kind `T` with this builder's configured
    /// settings.
    ///
    /// If the thread was created, this returns the task's [`TaskId`];
    /// otherwise, the arguments are dropped and a [`SpawnError`] is returned.
    #[inline]
    #[track_caller]
    pub fn spawn_detached<T: TaskFn>(&self, args: T::Args) -> Result<TaskId, SpawnError> {
        self.spawn_detached_inner(args, T::run, any::type_name::<T>())
    }

    /// Spawns a detached task running `body` with this builder's configured
    /// settings.
    ///
    /// If the thread was created, this returns the task's [`TaskId`];
    /// otherwise, the arguments are dropped and a [`SpawnError`] is returned.
    #[inline]
    #[track_caller]
    pub fn spawn_detached_fn<A, R, F>(&self, args: A, body: F) -> Result<TaskId, SpawnError>
    where
        F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
        A: Send + 'static,
        R: Send + Sync + 'static,
    {
        self.spawn_detached_inner(args, body, "fn")
    }

    #[track_caller]
    fn spawn_attached<A, R, F>(&self, args: A, body: F, kind: &'static str) -> Handle<R>
    where
        F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
        A: Send + 'static,
        R: Send + Sync + 'static,
    {
        let id = TaskId::next();
        let slot = Arc::new(Slot::new());
        let io = Io::new(args, Completer::attached(id, slot.clone()));
        match self.spawn_thread(io, body, kind) {
            Ok(thread) => Handle::spawned(id, thread, slot),
            Err(error) => Handle::failed(SpawnError::new(id, error), slot),
        }
    }

    #[track_caller]
    fn spawn_detached_inner<A, R, F>(
        &self,
        args: A,
        body: F,
        kind: &'static str,
    ) -> Result<TaskId, SpawnError>
    where
        F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
        A: Send + 'static,
        R: Send + Sync + 'static,
    {
        let id = TaskId::next();
        let io = Io::new(args, Completer::detached(id));
        // dropping the `JoinHandle` detaches the thread; its resources are
        // released when it exits.
        let _ = self
            .spawn_thread(io, body, kind)
            .map_err(|error| SpawnError::new(id, error))?;
        Ok(id)
    }

    /// Creates the task's thread, running `body` with `io` as its context.
    ///
    /// If the thread cannot be created, the closure (and with it, `io`) is
    /// dropped before this returns.
    #[track_caller]
    fn spawn_thread<A, R, F>(
        &self,
        io: Io<A, R>,
        body: F,
        kind: &'static str,
    ) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
        A: Send + 'static,
        R: Send + Sync + 'static,
    {
        let id = io.id();
        let mode = io.mode();
        let kind = self.kind.unwrap_or(kind);
        let location = Location::caller();
        let span = tracing::debug_span!(
            "task",
            task.id = %id,
            task.name = self.name,
            task.kind = kind,
            task.mode = %mode,
            task.spawned_at = %location,
        );

        let mut builder = thread::Builder::new();
        if let Some(name) = self.name {
            builder = builder.name(name.to_owned());
        }
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        // the task reports to whichever subscriber was current where it was
        // spawned, not just the global default.
        let dispatch = tracing::dispatcher::get_default(Clone::clone);
        let result = builder.spawn(move || {
            let _dispatch = tracing::dispatcher::set_default(&dispatch);
            let _span = span.entered();
            test_trace!("task body starting");
            let completed = body(io);
            debug_assert_eq!(
                completed.id, id,
                "a task body must return the `Completed` from its own `Io`"
            );
        });

        match result {
            Ok(ref thread) => tracing::debug!(
                task.id = %id,
                task.kind = kind,
                task.mode = %mode,
                thread.id = ?thread.thread().id(),
                "spawned task",
            ),
            Err(ref error) => tracing::debug!(
                task.id = %id,
                task.kind = kind,
                task.mode = %mode,
                %error,
                "failed to spawn task",
            ),
        }

        result
    }
}
