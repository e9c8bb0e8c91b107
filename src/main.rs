mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use video_skipper::error::Result;

fn main() -> Result<()> {
    // Browsers launch a native host with the caller's origin as the only argument
    let launched_by_browser = std::env::args()
        .nth(1)
        .is_some_and(|arg| arg.starts_with("chrome-extension://"));

    let cli = if launched_by_browser {
        None
    } else {
        Some(Cli::parse())
    };
    let verbose = cli.as_ref().is_some_and(|cli| cli.verbose);

    // stdout carries native messaging frames, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,video_skipper=debug")
        } else {
            EnvFilter::new("warn,video_skipper=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli {
            Some(cli) => cli.run().await,
            None => commands::host::run_for_browser().await,
        }
    })
}
