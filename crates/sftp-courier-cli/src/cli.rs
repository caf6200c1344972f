// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier CLI - Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Upload new files from a folder to an SFTP server, then move them aside
#[derive(Debug, Parser)]
#[command(name = "sftp-courier", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./config.ini, then the user config dir)
    #[arg(short, long, env = "SFTP_COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log alerts only; do not show desktop notifications
    #[arg(long, env = "SFTP_COURIER_NO_DESKTOP_ALERTS")]
    pub no_desktop_alerts: bool,

    /// Process files already in the folder, then exit without watching
    #[arg(long)]
    pub scan_only: bool,
}
