use anyhow::{Context, anyhow};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Log to stderr, keeping stdout free for the tool's output.
pub fn to_stderr(verbose: u8) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level(verbose))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("Could not set up logging")
}

// Full screen tools own the terminal, so their logs go to a file.
pub fn to_file(path: &Path, verbose: u8) -> anyhow::Result<()> {
    let file = File::create(path).context("Could not create log file")?;

    tracing_subscriber::fmt()
        .with_max_level(level(verbose))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("Could not set up logging")
}
