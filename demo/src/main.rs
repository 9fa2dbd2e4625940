use clap::Parser;
use hyphae_demo::{Options, Result};

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Options::parse();
    opts.output.init()?;

    tracing::debug!(?opts.cmd, color = %opts.output.color, "hyphae-demo configuration");
    opts.run()
}
