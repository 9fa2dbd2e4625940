use super::atomic::{AtomicU8, Ordering::*};
use core::{any, cell::UnsafeCell, fmt, mem::MaybeUninit};

/// A write-once slot holding a task's output.
///
/// The slot is written exactly once, by the task that owns the other end of
/// it, and read any number of times by the task's caller after the write has
/// been published. Publication is a `Release` store of the `READY` state;
/// readers observe it with an `Acquire` load, so a reader that sees `READY`
/// also sees the value.
pub(crate) struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU8,
}

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU8::new(EMPTY),
        }
    }

    /// Publish `value` into the slot, returning it back if the slot has
    /// already been written.
    pub(crate) fn publish(&self, value: T) -> Result<(), T> {
        if let Err(_actual) = self
            .state
            .compare_exchange(EMPTY, WRITING, AcqRel, Acquire)
        {
            test_debug!(state = _actual, "Slot::publish: already written");
            return Err(value);
        }

        unsafe {
            // Safety: we won the `EMPTY -> WRITING` transition, so nobody else
            // is writing, and readers don't touch the value until `READY`.
            (*self.value.get()).write(value);
        }

        if let Err(actual) = self
            .state
            .compare_exchange(WRITING, READY, AcqRel, Acquire)
        {
            unreachable!(
                "Slot<{}>: state changed while writing. This is a bug! (state={})",
                any::type_name::<T>(),
                actual
            );
        }
        test_trace!("Slot::publish: WRITING -> READY");
        Ok(())
    }

    /// Returns `true` if a value has been published.
    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.state.load(Acquire) == READY
    }

    /// Borrow the published value, or `None` if nothing has been published.
    #[inline]
    pub(crate) fn get(&self) -> Option<&T> {
        if !self.is_ready() {
            return None;
        }
        unsafe {
            // Safety: we just checked that the value was published, and it is
            // never written again.
            Some((*self.value.get()).assume_init_ref())
        }
    }

    /// Move the published value out of the slot, leaving it empty.
    pub(crate) fn take(&mut self) -> Option<T> {
        if self.state.load(Acquire) != READY {
            return None;
        }
        self.state.store(EMPTY, Release);
        test_trace!("Slot::take: READY -> EMPTY");
        unsafe {
            // Safety: the value was published, and we hold the only reference
            // to the slot. Resetting the state first means `Drop` won't touch
            // the moved-out value.
            Some((*self.value.get()).assume_init_read())
        }
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if self.state.load(Acquire) == READY {
            unsafe {
                // Safety: the value was published and has not been taken.
                (*self.value.get()).assume_init_drop();
            }
        }
    }
}

// Safety: the value is only ever moved in by one thread and then shared
// through `&T`, exactly like `std::sync::OnceLock`.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Slot");
        d.field("type", &any::type_name::<T>());
        match (self.get(), self.state.load(Acquire)) {
            (Some(value), _) => d.field("value", value).finish(),
            (None, WRITING) => d.field("value", &format_args!("<writing>")).finish(),
            (None, _) => d.field("value", &format_args!("<empty>")).finish(),
        }
    }
}
