//! Terminal output settings.
use clap::{ArgGroup, Args};
use std::fmt;

pub use atty::Stream;
pub use owo_colors::{style, OwoColorize, Style};

#[derive(Debug, Args)]
#[command(
    next_help_heading = "Output Options",
    group = ArgGroup::new("output-opts").multiple(true),
)]
pub struct OutputOptions {
    /// Whether to emit colors in output.
    #[arg(
        long,
        env = "CARGO_TERM_COLORS",
        default_value_t = ColorMode::Auto,
        global = true,
        group = "output-opts",
    )]
    pub color: ColorMode,

    /// Which log events to print, as a comma-separated list of
    /// `target=level` directives.
    #[arg(
        short,
        long,
        env = "RUST_LOG",
        default_value = "hyphae=info,hyphae_demo=info,warn",
        global = true,
        group = "output-opts",
    )]
    pub log: tracing_subscriber::filter::Targets,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
#[value(rename_all = "lower")]
pub enum ColorMode {
    /// Color a stream only if it is a TTY.
    #[default]
    Auto,
    /// Always color output.
    Always,
    /// Never color output.
    Never,
}

// === impl OutputOptions ===

impl OutputOptions {
    pub fn init(&self) -> color_eyre::Result<()> {
        self.trace_init()
    }
}

// === impl ColorMode ===

impl ColorMode {
    pub fn enabled(self, stream: Stream) -> bool {
        match self {
            ColorMode::Auto => atty::is(stream),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }

    /// Returns `style` when `stream` gets colors, or a style that prints
    /// nothing extra when it doesn't.
    pub fn style_for(self, stream: Stream, style: Style) -> Style {
        if self.enabled(stream) {
            style
        } else {
            owo_colors::style()
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        };
        f.pad(name)
    }
}
