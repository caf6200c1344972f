// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Folder notifier
//
// Bridges the OS watcher callback onto two async channels: one for file
// events, one for watcher errors. Dropping the Notifier stops the watch
// and closes both channels.

use crate::types::WatchSetupError;
use async_channel::{Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Queued events before the watcher thread waits on the dispatcher
const EVENT_CAPACITY: usize = 256;
const ERROR_CAPACITY: usize = 16;

/// Kind of change reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Write,
    Remove,
    Rename,
    Other,
}

impl From<&EventKind> for FileOp {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Create,
            // A file moved into the folder counts as new
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Self::Create,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Rename,
            EventKind::Modify(_) => Self::Write,
            EventKind::Remove(_) => Self::Remove,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub op: FileOp,
}

impl WatchEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            op: FileOp::Create,
        }
    }
}

/// An error reported by the OS watcher while running
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct NotifierError {
    pub message: String,
}

impl From<notify::Error> for NotifierError {
    fn from(err: notify::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// Receiving ends consumed by the dispatcher
pub struct WatchStreams {
    pub events: Receiver<WatchEvent>,
    pub errors: Receiver<NotifierError>,
}

/// Sending ends fed by the watcher callback
#[derive(Clone)]
pub struct WatchSenders {
    pub events: Sender<WatchEvent>,
    pub errors: Sender<NotifierError>,
}

/// Create a connected sender/stream pair
pub fn watch_channels(capacity: usize) -> (WatchSenders, WatchStreams) {
    let (event_tx, event_rx) = async_channel::bounded(capacity);
    let (error_tx, error_rx) = async_channel::bounded(ERROR_CAPACITY);
    (
        WatchSenders {
            events: event_tx,
            errors: error_tx,
        },
        WatchStreams {
            events: event_rx,
            errors: error_rx,
        },
    )
}

impl WatchSenders {
    /// Forward one watcher callback result, waiting if the queue is full
    fn forward(&self, result: notify::Result<notify::Event>) {
        match result {
            Ok(event) => {
                let op = FileOp::from(&event.kind);
                for path in event.paths {
                    if self.events.send_blocking(WatchEvent { path, op }).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                let _ = self.errors.send_blocking(NotifierError::from(err));
            }
        }
    }
}

/// A live, non-recursive watch on one folder
pub struct Notifier {
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl Notifier {
    /// Start watching `dir`; events flow into the returned streams
    pub fn watch(dir: &Path) -> Result<(Self, WatchStreams), WatchSetupError> {
        let (senders, streams) = watch_channels(EVENT_CAPACITY);

        let handler = move |result: notify::Result<notify::Event>| senders.forward(result);
        let mut watcher = notify::recommended_watcher(handler).map_err(WatchSetupError::Create)?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchSetupError::Watch {
                path: dir.to_path_buf(),
                source,
            })?;

        tracing::info!("Watching {} folder for new files...", dir.display());
        Ok((
            Self {
                _watcher: watcher,
                dir: dir.to_path_buf(),
            },
            streams,
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        tracing::debug!("Releasing watch on {}", self.dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(FileOp::from(&EventKind::Create(CreateKind::File)), FileOp::Create);
        assert_eq!(
            FileOp::from(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            FileOp::Create
        );
        assert_eq!(
            FileOp::from(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            FileOp::Rename
        );
        assert_eq!(
            FileOp::from(&EventKind::Modify(ModifyKind::Data(DataChange::Any))),
            FileOp::Write
        );
        assert_eq!(FileOp::from(&EventKind::Remove(RemoveKind::File)), FileOp::Remove);
        assert_eq!(FileOp::from(&EventKind::Any), FileOp::Other);
    }

    #[test]
    fn test_forward_splits_paths_and_errors() {
        let (senders, streams) = watch_channels(8);
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/w/a.cmf"))
            .add_path(PathBuf::from("/w/b.cmf"));

        senders.forward(Ok(event));
        senders.forward(Err(notify::Error::generic("queue overflow")));

        assert_eq!(streams.events.try_recv().unwrap(), WatchEvent::created("/w/a.cmf"));
        assert_eq!(streams.events.try_recv().unwrap(), WatchEvent::created("/w/b.cmf"));
        assert!(streams.errors.try_recv().unwrap().message.contains("queue overflow"));
    }

    #[test]
    fn test_watch_missing_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let result = Notifier::watch(&tmp.path().join("absent"));
        assert!(matches!(result, Err(WatchSetupError::Watch { .. })));
    }

    #[tokio::test]
    async fn test_dropping_notifier_closes_streams() {
        let tmp = TempDir::new().unwrap();
        let (notifier, streams) = Notifier::watch(tmp.path()).unwrap();
        drop(notifier);

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            while streams.events.recv().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn test_reports_created_file() {
        let tmp = TempDir::new().unwrap();
        let (_notifier, streams) = Notifier::watch(tmp.path()).unwrap();
        let path = tmp.path().join("report.cmf");
        std::fs::write(&path, b"x").unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match streams.events.recv().await {
                    Ok(event) if event.op == FileOp::Create && event.path.ends_with("report.cmf") => {
                        return true
                    }
                    Ok(_) => continue,
                    Err(_) => return false,
                }
            }
        })
        .await;
        assert!(matches!(seen, Ok(true)));
    }
}
