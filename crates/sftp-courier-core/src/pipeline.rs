// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Pipeline context
//
// The pipeline owns the remote session for the lifetime of the process and
// carries everything the upload and archive steps need. The scanner and the
// dispatcher both drive files through it, one at a time.

use crate::alert::{Alert, AlertSink};
use crate::archive;
use crate::filter::{self, ExtensionSet};
use crate::session::RemoteSession;
use crate::transfer;
use crate::types::FileError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the subfolder handled files are moved into
pub const PROCESSED_DIR_NAME: &str = "processed";

/// The subset of configuration the pipeline works from
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub watch_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub extensions: ExtensionSet,
    pub destination_prefix: String,
}

impl WatchSettings {
    pub fn new(watch_dir: PathBuf, extensions: ExtensionSet, destination_prefix: String) -> Self {
        let processed_dir = watch_dir.join(PROCESSED_DIR_NAME);
        Self {
            watch_dir,
            processed_dir,
            extensions,
            destination_prefix,
        }
    }
}

/// What became of a file reported by the notifier
#[derive(Debug)]
pub enum LiveOutcome {
    /// Extension not in the configured set
    NotQualifying,
    /// No longer a regular file by the time it was handled
    Missing,
    Delivered { bytes: u64 },
    /// Already logged and alerted
    Failed(FileError),
}

pub struct Pipeline<S> {
    session: S,
    settings: WatchSettings,
    alerts: Arc<dyn AlertSink>,
}

impl<S: RemoteSession> Pipeline<S> {
    pub fn new(session: S, settings: WatchSettings, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            session,
            settings,
            alerts,
        }
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Whether the file's extension is one we upload
    pub fn qualifies(&self, path: &Path) -> bool {
        filter::path_matches(path, &self.settings.extensions)
    }

    /// Upload an open file to the destination folder
    pub fn upload(&mut self, path: &Path, file: &mut File) -> Result<u64, FileError> {
        let bytes = transfer::upload(
            path,
            file,
            &mut self.session,
            &self.settings.destination_prefix,
        )?;
        Ok(bytes)
    }

    /// Create the processed folder if needed. Returns `true` if it was created.
    pub fn ensure_processed_dir(&self) -> Result<bool, FileError> {
        let dir = &self.settings.processed_dir;
        let created = archive::ensure_dir(dir).map_err(|source| FileError::ProcessedDir {
            path: dir.clone(),
            source,
        })?;
        if created {
            tracing::info!("Created 'processed' folder: {}", dir.display());
        }
        Ok(created)
    }

    /// Move an open file into the processed folder
    pub fn archive(&mut self, path: &Path, file: &mut File) -> Result<u64, FileError> {
        self.ensure_processed_dir()?;
        let dest = self.processed_path(path);
        let bytes = archive::relocate(path, file, &dest)?;
        Ok(bytes)
    }

    /// `<processed>/<basename>` for a file in the watch folder
    pub fn processed_path(&self, path: &Path) -> PathBuf {
        match path.file_name() {
            Some(name) => self.settings.processed_dir.join(name),
            None => self.settings.processed_dir.clone(),
        }
    }

    /// Open, upload and archive one file, stopping at the first failure
    pub fn deliver(&mut self, path: &Path) -> Result<u64, FileError> {
        let mut file = File::open(path).map_err(|source| FileError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let bytes = self.upload(path, &mut file)?;
        self.archive(path, &mut file)?;
        Ok(bytes)
    }

    /// Handle a file the notifier saw appear
    pub fn handle_created(&mut self, path: &Path) -> LiveOutcome {
        if !self.qualifies(path) {
            tracing::debug!("Ignoring non-matching file: {}", path.display());
            return LiveOutcome::NotQualifying;
        }

        if !path.is_file() {
            tracing::debug!("Skipping {}: no longer a regular file", path.display());
            return LiveOutcome::Missing;
        }

        tracing::info!("New file detected: {}", path.display());
        match self.deliver(path) {
            Ok(bytes) => LiveOutcome::Delivered { bytes },
            Err(err) => {
                self.report_failure(&err);
                LiveOutcome::Failed(err)
            }
        }
    }

    /// Log and alert a per-file failure
    pub fn report_failure(&self, err: &FileError) {
        self.alert(Alert::error("Error", err.to_string()));
    }

    pub fn alert(&self, alert: Alert) {
        self.alerts.alert(alert);
    }
}
