// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Error and report types

use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;

/// Errors raised while locating or reading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Fatal errors; any of these stops the courier
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    WatchSetup(#[from] WatchSetupError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchSetupError {
    #[error("Failed to create file watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("Failed to watch folder {}: {}", .path.display(), .source)]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read directory {}: {}", .path.display(), .source)]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the upload step
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Failed to create remote file {path}: {source}")]
    RemoteCreate {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to upload file to {path}: {source}")]
    Copy {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to close remote file {path}: {source}")]
    Close {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Failures of the move-to-processed step
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Failed to create destination file {}: {}", .path.display(), .source)]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy file to {}: {}", .path.display(), .source)]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete source file {}: {}", .path.display(), .source)]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A failure confined to a single file; the pipeline moves on after it
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to open file {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Failed to create 'processed' folder {}: {}", .path.display(), .source)]
    ProcessedDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Outcome of the startup scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Qualifying files found in the watch folder
    pub qualifying: usize,
    /// Files whose upload completed
    pub uploaded: usize,
    /// Files moved into the processed folder
    pub archived: usize,
    /// Open, upload and archive failures
    pub failures: usize,
}

/// Counters kept by the dispatcher for the lifetime of the watch
#[derive(Debug, Clone)]
pub struct DispatchStats {
    pub started_at: DateTime<Utc>,
    pub events_received: u64,
    pub ignored: u64,
    pub delivered: u64,
    pub failed: u64,
    pub notifier_errors: u64,
    pub last_delivery: Option<DateTime<Utc>>,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            events_received: 0,
            ignored: 0,
            delivered: 0,
            failed: 0,
            notifier_errors: 0,
            last_delivery: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_messages_name_the_path() {
        let err = FileError::Open {
            path: PathBuf::from("/watch/data.cmf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Failed to open file /watch/data.cmf: denied");

        let err: FileError = TransferError::RemoteCreate {
            path: "/upload/data.cmf".to_string(),
            source: io::Error::new(io::ErrorKind::Other, "refused"),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Failed to create remote file /upload/data.cmf: refused"
        );
    }

    #[test]
    fn test_config_error_wraps_into_courier_error() {
        let err: CourierError = ConfigError::NotFound(PathBuf::from("config.ini")).into();
        assert!(matches!(err, CourierError::Config(ConfigError::NotFound(_))));
        assert_eq!(
            err.to_string(),
            "Configuration error: Configuration file not found: config.ini"
        );
    }
}
