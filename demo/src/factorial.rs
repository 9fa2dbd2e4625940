//! Factorials, computed by spawning one task per decrement.
use crate::Result;
use color_eyre::{eyre::WrapErr, Help};
use hyphae::{Builder, Completed, Handle, Io, JoinError, TaskFn};

/// Computes `n!` as `n * (n - 1)!`, where `(n - 1)!` is computed by a child
/// task.
pub struct Factorial;

/// What a [`Factorial`] task produces.
pub type Output = core::result::Result<u64, FactorialError>;

/// Why a factorial couldn't be computed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FactorialError {
    /// `n!` doesn't fit in a `u64`.
    #[error("{n}! overflowed a `u64`")]
    Overflow { n: u64 },

    /// The task computing `n!` failed to join.
    #[error("the task computing {n}! failed")]
    Task {
        n: u64,
        #[source]
        error: JoinError,
    },
}

impl TaskFn for Factorial {
    type Args = u64;
    type Output = Output;

    fn run(io: Io<u64, Output>) -> Completed {
        let n = *io.args();
        if n == 0 {
            return io.complete(Ok(1));
        }

        let child = factorial_start(n - 1);
        let product = multiply(n, child.into_output());
        io.complete(product)
    }
}

/// Combines `n` with the outcome of the child task that computed `(n - 1)!`.
///
/// A failure further down the chain is passed up unchanged, so the error
/// names the task that actually failed.
fn multiply(n: u64, child: core::result::Result<Output, JoinError>) -> Output {
    match child {
        Ok(Ok(rest)) => n.checked_mul(rest).ok_or(FactorialError::Overflow { n }),
        Ok(Err(error)) => Err(error),
        Err(error) => {
            tracing::warn!(%error, n = n - 1, "child factorial task failed");
            Err(FactorialError::Task { n: n - 1, error })
        }
    }
}

/// Start computing `n!` on a new task.
///
/// If the task's thread couldn't be created, the error is logged here, and
/// reported again when the handle is finished.
pub fn factorial_start(n: u64) -> Handle<Output> {
    let name = format!("factorial({n})");
    let handle = Builder::new()
        .name(&name)
        .kind("factorial")
        .spawn::<Factorial>(n);
    if let Err(error) = handle.spawn_status() {
        tracing::error!(%error, n, "failed to start factorial task");
    }
    handle
}

/// Wait for a factorial task started by [`factorial_start`], and return `n!`.
pub fn factorial_finish(handle: Handle<Output>) -> Result<u64> {
    let id = handle.id();
    match handle.into_output() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error @ FactorialError::Overflow { .. })) => Err(error)
            .suggestion("factorials of numbers larger than 20 don't fit in a `u64`"),
        Ok(Err(error)) => {
            tracing::error!(task.id = %id, %error, "a factorial task further down the chain failed");
            Err(error).wrap_err("computing a factorial failed")
        }
        Err(error) => {
            tracing::error!(task.id = %id, %error, "factorial task failed");
            Err(error).wrap_err("joining a factorial task failed")
        }
    }
}

/// Compute the factorial of each of `ns`, starting every chain before
/// finishing any of them.
pub fn run(ns: &[u64]) -> Result<()> {
    let _span = tracing::info_span!("factorial", ?ns).entered();

    let handles = ns
        .iter()
        .map(|&n| {
            tracing::info!("Started {n}!");
            (n, factorial_start(n))
        })
        .collect::<Vec<_>>();

    for (n, handle) in handles {
        let value = factorial_finish(handle).with_context(|| format!("computing {n}!"))?;
        tracing::info!("Finished {n}! = {value}");
        println!("{n}! = {value}");
    }

    Ok(())
}
