//! A detached countdown task that signals a shared flag when it goes off.
use crate::{
    term::{style, ColorMode, OwoColorize, Stream, Style},
    Result,
};
use color_eyre::eyre::WrapErr;
use hyphae::{Builder, Completed, Io};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Options for the `countdown` subcommand.
#[derive(Debug, clap::Args)]
pub struct Cmd {
    /// How many ticks to count down from.
    #[arg(long, default_value_t = 5)]
    secs: u32,

    /// How long each tick lasts, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
}

/// The argument record for a countdown task.
pub struct Countdown<W> {
    /// The number printed first.
    pub secs: u32,
    /// The time between numbers.
    pub tick: Duration,
    /// Set once the countdown has gone off.
    pub done: Arc<AtomicBool>,
    /// Where the countdown is printed.
    pub out: W,
    /// How to print `boom!`.
    pub boom: Style,
}

/// The countdown task body.
///
/// Prints `secs...` down to `1...`, one per tick, then `boom!`, then sets the
/// `done` flag and completes with `0`.
pub fn countdown<W: Write>(io: Io<Countdown<W>, i32>) -> Completed {
    let (
        Countdown {
            secs,
            tick,
            done,
            mut out,
            boom,
        },
        completer,
    ) = io.split();

    for remaining in (1..=secs).rev() {
        if let Err(error) = writeln!(out, "{remaining}...") {
            tracing::warn!(%error, "failed to print countdown");
        }
        thread::sleep(tick);
    }
    if let Err(error) = writeln!(out, "{}", "boom!".style(boom)) {
        tracing::warn!(%error, "failed to print countdown");
    }

    done.store(true, Ordering::Release);
    completer.complete(0)
}

// === impl Cmd ===

impl Default for Cmd {
    fn default() -> Self {
        Self {
            secs: 5,
            tick_ms: 1000,
        }
    }
}

impl Cmd {
    pub fn run(&self, color: ColorMode) -> Result<()> {
        let _span = tracing::info_span!("countdown", secs = self.secs).entered();

        let done = Arc::new(AtomicBool::new(false));
        let boom = color.style_for(Stream::Stdout, style().red().bold());
        let id = Builder::new()
            .name("countdown")
            .kind("countdown")
            .spawn_detached_fn(
                Countdown {
                    secs: self.secs,
                    tick: Duration::from_millis(self.tick_ms),
                    done: done.clone(),
                    out: io::stdout(),
                    boom,
                },
                countdown,
            )
            .wrap_err("failed to start the countdown")?;
        tracing::info!("Started countdown (task {id})");

        // nothing to join; the flag is the only way to know it went off.
        let poll = Duration::from_millis(self.tick_ms.clamp(1, 10));
        while !done.load(Ordering::Acquire) {
            thread::sleep(poll);
        }
        tracing::info!("Finished countdown");

        Ok(())
    }
}
