// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Shared pipeline logic
//
// This crate provides:
// - CourierConfig, loaded from an INI file
// - Pipeline, which uploads a file and moves it to the processed folder
// - The startup scan and the live Dispatcher loop
// - Notifier, a non-recursive folder watch feeding async channels
//
// The SSH/SFTP client and the desktop alerts live in the CLI crate.

pub mod alert;
pub mod archive;
pub mod config;
pub mod dispatcher;
pub mod filter;
pub mod pipeline;
pub mod scanner;
pub mod session;
pub mod transfer;
pub mod types;
pub mod watcher;

// Re-export commonly used items
pub use alert::{Alert, AlertSink, ChannelAlerts, LogAlerts, Severity};
pub use config::{discover_config_path, CourierConfig, Credentials};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use filter::ExtensionSet;
pub use pipeline::{LiveOutcome, Pipeline, WatchSettings};
pub use scanner::{scan_existing, scan_in_background};
pub use session::RemoteSession;
pub use types::{
    ConfigError, CourierError, DispatchStats, FileError, ScanError, ScanReport, WatchSetupError,
};
pub use watcher::{Notifier, WatchEvent, WatchStreams};
