//! Synchronization primitives used to hand a task's output back to its
//! caller.

#[cfg(loom)]
pub(crate) use loom::sync::atomic;

#[cfg(not(loom))]
pub(crate) use core::sync::atomic;

mod slot;

pub(crate) use self::slot::Slot;
