use clap::Parser;

pub use color_eyre::eyre::Result;

pub mod countdown;
pub mod factorial;
pub mod term;
mod trace;

#[derive(Debug, Parser)]
#[command(
    name = "hyphae-demo",
    version,
    about = "runs sample programs on `hyphae` tasks"
)]
pub struct Options {
    /// Which program to run?
    ///
    /// By default, everything is run.
    #[command(subcommand)]
    pub cmd: Option<Subcommand>,

    #[command(flatten)]
    pub output: term::OutputOptions,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Compute factorials, one chain of tasks per number.
    ///
    /// Every chain is started before any of them is joined, so the chains run
    /// interleaved.
    Factorial {
        /// The numbers to compute factorials of.
        #[arg(required = true)]
        n: Vec<u64>,
    },

    /// Start a detached countdown and wait for it to go off.
    Countdown(countdown::Cmd),

    /// Compute `5!`, then run a 5 second countdown.
    All,
}

// === impl Options ===

impl Options {
    pub fn run(&self) -> Result<()> {
        let color = self.output.color;
        match self.cmd {
            Some(ref cmd) => cmd.run(color),
            None => Subcommand::All.run(color),
        }
    }
}

// === impl Subcommand ===

impl Subcommand {
    pub fn run(&self, color: term::ColorMode) -> Result<()> {
        match self {
            Subcommand::Factorial { n } => factorial::run(n),
            Subcommand::Countdown(cmd) => cmd.run(color),
            Subcommand::All => {
                factorial::run(&[5])?;
                countdown::Cmd::default().run(color)
            }
        }
    }
}
