//! Switches between `loom`'s model-checked primitives and the real ones.
//!
//! With `--cfg loom`, everything here comes from `loom`. Otherwise, tests
//! get thin stand-ins with the same shape, so the same test bodies run once
//! on real threads.
#[allow(unused_imports)]
pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    pub(crate) use loom::{alloc, model, sync, thread};
}

#[cfg(not(loom))]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) mod sync {
        pub(crate) use std::sync::*;
    }


    /// Runs `f` exactly once.
    #[cfg(test)]
    pub(crate) fn model(f: impl Fn()) {
        let _trace = crate::test_util::trace_init();
        f()
    }

}
