//! Command-line surface: `--help`, `--version`, `--fg`, `--tmpdir PATH`.

use std::path::PathBuf;

use clap::Parser;

/// Session-bus service exposing `de.tahifi.FileTransfer`.
#[derive(Debug, Parser)]
#[command(name = "dbusdl", version, about = "D-Bus download daemon", long_about = None)]
pub struct Cli {
    /// Run in the foreground instead of forking into a daemon.
    #[arg(long)]
    pub fg: bool,

    /// Directory to store downloaded and in-progress files in. Defaults to
    /// the XDG cache directory for this service.
    #[arg(long, value_name = "PATH")]
    pub tmpdir: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
