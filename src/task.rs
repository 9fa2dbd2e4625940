//! Tasks: single function invocations, each running on its own OS thread.
//!
//! A *task* is one call to a function body that has been handed off to a
//! dedicated thread. Spawning a task returns immediately. In *attached* mode
//! the caller gets a [`Handle`], which can be polled for completion without
//! blocking, and joined to retrieve the function's return value. In
//! *detached* mode the caller gets nothing but a status; the task owns its
//! own bookkeeping and drops it when it finishes.
//!
//! # Declaring a task
//!
//! A function kind pairs an argument record with a return type. It can be
//! declared once by implementing [`TaskFn`]:
//!
//! ```
//! use hyphae::task::{Completed, Io, TaskFn};
//!
//! struct Square;
//!
//! impl TaskFn for Square {
//!     type Args = u64;
//!     type Output = u64;
//!
//!     fn run(io: Io<u64, u64>) -> Completed {
//!         let n = *io.args();
//!         io.complete(n * n)
//!     }
//! }
//!
//! let mut handle = hyphae::spawn::<Square>(12);
//! assert!(handle.spawn_status().is_ok());
//! assert_eq!(handle.join(), Ok(&144));
//!
//! // the result is cached, so this doesn't block or touch the thread again.
//! assert_eq!(handle.join(), Ok(&144));
//! ```
//!
//! Or by passing any `FnOnce(Io<A, R>) -> Completed` closure to
//! [`spawn_fn`]:
//!
//! ```
//! let handle = hyphae::spawn_fn(String::from("hello"), |io| {
//!     let len = io.args().len();
//!     io.complete(len)
//! });
//! assert_eq!(handle.into_output(), Ok(5));
//! ```
//!
//! # Completing a task
//!
//! The body of a task receives an [`Io`], which owns the task's arguments and
//! its side of the return slot. The *only* way for a body to produce the
//! [`Completed`] value it must return is to call [`Io::complete`] (or
//! [`Completer::complete`]), so every path out of a task body publishes
//! exactly one return value.
use crate::sync::Slot;
use core::fmt;
use std::sync::Arc;

mod builder;
mod handle;
mod id;

#[cfg(test)]
mod tests;

pub use self::{
    builder::Builder,
    handle::{Handle, JoinError, SpawnError},
    id::TaskId,
};

/// A function that can be spawned as a [task](crate::task).
///
/// Implementing this trait declares, once, the shape of a function kind: the
/// argument record it is called with, and the type of value it returns.
/// Tasks of this kind are spawned with [`spawn`] or [`spawn_detached`].
pub trait TaskFn: 'static {
    /// The argument record passed to each invocation.
    ///
    /// Arguments are moved into the task when it is spawned.
    type Args: Send + 'static;

    /// The value each invocation produces.
    type Output: Send + Sync + 'static;

    /// The task body.
    ///
    /// This runs on the task's own thread. It must finish by calling
    /// [`Io::complete`] and returning the resulting [`Completed`].
    fn run(io: Io<Self::Args, Self::Output>) -> Completed;
}

/// A running task's context: its arguments and its side of the return slot.
///
/// An `Io` is created when a task is spawned, moved onto the task's thread,
/// and consumed by [`Io::complete`].
pub struct Io<A, R> {
    args: A,
    completer: Completer<R>,
}

/// The completion half of an [`Io`], returned by [`Io::split`].
///
/// This allows a task body to take ownership of its arguments while keeping
/// its obligation to complete.
#[must_use = "a task body must call `Completer::complete`"]
pub struct Completer<R> {
    id: TaskId,
    output: Output<R>,
}

/// Proof that a task called its completion gate.
///
/// A `Completed` can only be obtained from [`Io::complete`] or
/// [`Completer::complete`], and every task body must return one.
#[must_use = "a task body must return the `Completed` token from `Io::complete`"]
#[derive(Debug)]
pub struct Completed {
    id: TaskId,
}

/// Who owns a task's bookkeeping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The caller holds a [`Handle`], and is responsible for joining it.
    Attached,
    /// No handle exists. The task drops its own bookkeeping when it
    /// completes, and its thread is never joined.
    Detached,
}

enum Output<R> {
    Attached(Arc<Slot<R>>),
    Detached,
}

/// Spawn a task of kind `T` on a new thread, returning a [`Handle`] to it.
///
/// This is a shorthand for [`Builder::new().spawn::<T>(args)`](Builder::spawn).
///
/// The returned handle must be checked with [`Handle::spawn_status`] to find
/// out whether the thread was actually created.
#[track_caller]
pub fn spawn<T: TaskFn>(args: T::Args) -> Handle<T::Output> {
    Builder::new().spawn::<T>(args)
}

/// Spawn a task running `body` on a new thread, returning a [`Handle`] to it.
///
/// This is a shorthand for [`Builder::new().spawn_fn(args, body)`](Builder::spawn_fn).
#[track_caller]
pub fn spawn_fn<A, R, F>(args: A, body: F) -> Handle<R>
where
    F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
    A: Send + 'static,
    R: Send + Sync + 'static,
{
    Builder::new().spawn_fn(args, body)
}

/// Spawn a detached task of kind `T` on a new thread.
///
/// No [`Handle`] is returned, so the task's output cannot be retrieved. If
/// the caller needs to know when the task has finished, the task must
/// signal it through something passed in its arguments.
///
/// This is a shorthand for [`Builder::new().spawn_detached::<T>(args)`](Builder::spawn_detached).
#[track_caller]
pub fn spawn_detached<T: TaskFn>(args: T::Args) -> Result<TaskId, SpawnError> {
    Builder::new().spawn_detached::<T>(args)
}

/// Spawn a detached task running `body` on a new thread.
///
/// This is a shorthand for [`Builder::new().spawn_detached_fn(args, body)`](Builder::spawn_detached_fn).
#[track_caller]
pub fn spawn_detached_fn<A, R, F>(args: A, body: F) -> Result<TaskId, SpawnError>
where
    F: FnOnce(Io<A, R>) -> Completed + Send + 'static,
    A: Send + 'static,
    R: Send + Sync + 'static,
{
    Builder::new().spawn_detached_fn(args, body)
}

// === impl Io ===

impl<A, R> Io<A, R> {
    fn new(args: A, completer: Completer<R>) -> Self {
        Self { args, completer }
    }

    /// Borrow the task's arguments.
    #[inline]
    #[must_use]
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Returns this task's [`TaskId`].
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.completer.id
    }

    /// Returns whether this task was spawned attached or detached.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.completer.mode()
    }

    /// Take ownership of the arguments, keeping the obligation to complete.
    pub fn split(self) -> (A, Completer<R>) {
        (self.args, self.completer)
    }

    /// Complete the task with `value`.
    ///
    /// If the task is attached, `value` is published to the task's
    /// [`Handle`] and the handle starts reporting the task as
    /// [complete](Handle::is_complete). If the task is detached, nobody can
    /// read `value`, so it is dropped along with the task's arguments.
    pub fn complete(self, value: R) -> Completed {
        // drop the arguments before publishing, so that anything they hold is
        // released by the time the caller sees the output.
        let (args, completer) = self.split();
        drop(args);
        completer.complete(value)
    }
}

impl<A: fmt::Debug, R> fmt::Debug for Io<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Io")
            .field("args", &self.args)
            .field("completer", &self.completer)
            .finish()
    }
}

// === impl Completer ===

impl<R> Completer<R> {
    fn attached(id: TaskId, slot: Arc<Slot<R>>) -> Self {
        Self {
            id,
            output: Output::Attached(slot),
        }
    }

    fn detached(id: TaskId) -> Self {
        Self {
            id,
            output: Output::Detached,
        }
    }

    /// Returns the [`TaskId`] of the task this completes.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns whether this task was spawned attached or detached.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self.output {
            Output::Attached(_) => Mode::Attached,
            Output::Detached => Mode::Detached,
        }
    }

    /// Complete the task with `value`.
    ///
    /// See [`Io::complete`] for details.
    pub fn complete(self, value: R) -> Completed {
        let Self { id, output } = self;
        match output {
            Output::Attached(slot) => {
                let published = slot.publish(value).is_ok();
                debug_assert!(published, "task {id} completed twice, this is a bug!");
                tracing::debug!(task.id = %id, "task completed");
            }
            Output::Detached => {
                drop(value);
                tracing::debug!(task.id = %id, "detached task completed");
            }
        }
        Completed { id }
    }
}

impl<R> fmt::Debug for Completer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("id", &self.id)
            .field("mode", &self.mode())
            .field("output", &core::any::type_name::<R>())
            .finish()
    }
}

// === impl Completed ===

impl Completed {
    /// Returns the [`TaskId`] of the task that completed.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }
}

// === impl Mode ===

impl Mode {
    /// Returns the mode's name, as used in `tracing` fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Attached => "attached",
            Mode::Detached => "detached",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
