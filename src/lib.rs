#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

#[macro_use]
mod macros;

pub(crate) mod loom;
pub(crate) mod sync;
pub mod task;

#[doc(inline)]
pub use self::task::{
    spawn, spawn_detached, spawn_detached_fn, spawn_fn, Builder, Completed, Completer, Handle,
    Io, JoinError, Mode, SpawnError, TaskFn, TaskId,
};
