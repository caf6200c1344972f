// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Event dispatcher
//
// Waits on the notifier's event and error channels and drives each new file
// through the pipeline, one at a time. A closed channel ends the loop.

use crate::alert::Alert;
use crate::pipeline::{LiveOutcome, Pipeline};
use crate::session::RemoteSession;
use crate::types::{CourierError, DispatchStats};
use crate::watcher::{FileOp, NotifierError, WatchEvent, WatchStreams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Watching,
    Terminated,
}

pub struct Dispatcher<S> {
    /// Taken while an event is handled on the blocking pool
    pipeline: Option<Pipeline<S>>,
    state: DispatcherState,
    stats: DispatchStats,
}

impl<S: RemoteSession> Dispatcher<S> {
    pub fn new(pipeline: Pipeline<S>) -> Self {
        Self {
            pipeline: Some(pipeline),
            state: DispatcherState::Idle,
            stats: DispatchStats::default(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Give back the pipeline. `None` if an event handler was still running
    /// on the blocking pool when `run` was cancelled.
    pub fn into_pipeline(self) -> Option<Pipeline<S>> {
        self.pipeline
    }

    /// Mark the loop as stopped after `run` was cancelled from outside
    pub fn interrupt(&mut self) {
        if self.pipeline.is_none() {
            tracing::warn!("Interrupted while a file was being handled");
        }
        self.state = DispatcherState::Terminated;
    }

    /// Process events until either channel closes
    pub async fn run(&mut self, streams: WatchStreams) -> Result<(), CourierError> {
        self.state = DispatcherState::Watching;
        self.stats.started_at = chrono::Utc::now();

        let result = loop {
            tokio::select! {
                event = streams.events.recv() => {
                    match event {
                        Ok(event) => {
                            if let Err(e) = self.handle_event(event).await {
                                break Err(e);
                            }
                        }
                        Err(_) => {
                            tracing::info!("File event channel closed");
                            break Ok(());
                        }
                    }
                }
                error = streams.errors.recv() => {
                    match error {
                        Ok(error) => self.handle_error(error),
                        Err(_) => {
                            tracing::info!("Watcher error channel closed");
                            break Ok(());
                        }
                    }
                }
            }
        };

        self.state = DispatcherState::Terminated;
        result
    }

    /// Handle one notifier event to completion
    pub async fn handle_event(&mut self, event: WatchEvent) -> Result<(), CourierError> {
        self.stats.events_received += 1;

        if event.op != FileOp::Create {
            tracing::trace!("Ignoring {:?} event for {}", event.op, event.path.display());
            self.stats.ignored += 1;
            return Ok(());
        }

        // Cheap check first, so non-matching names skip the blocking pool
        if let Some(pipeline) = &self.pipeline {
            if !pipeline.qualifies(&event.path) {
                tracing::debug!("Ignoring non-matching file: {}", event.path.display());
                self.stats.ignored += 1;
                return Ok(());
            }
        }

        let mut pipeline = self.pipeline.take().ok_or_else(|| {
            CourierError::Runtime("Pipeline was lost by an earlier event".to_string())
        })?;

        let (pipeline, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = pipeline.handle_created(&event.path);
            (pipeline, outcome)
        })
        .await
        .map_err(|e| CourierError::Runtime(format!("Event handler failed: {}", e)))?;
        self.pipeline = Some(pipeline);

        match outcome {
            LiveOutcome::NotQualifying | LiveOutcome::Missing => self.stats.ignored += 1,
            LiveOutcome::Delivered { .. } => {
                self.stats.delivered += 1;
                self.stats.last_delivery = Some(chrono::Utc::now());
            }
            LiveOutcome::Failed(_) => self.stats.failed += 1,
        }
        Ok(())
    }

    /// Surface a watcher error; the watch keeps running
    pub fn handle_error(&mut self, error: NotifierError) {
        self.stats.notifier_errors += 1;
        let message = format!("File watcher error: {}", error);
        match &self.pipeline {
            Some(pipeline) => pipeline.alert(Alert::error("Error", message)),
            None => tracing::error!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::recording::RecordingAlerts;
    use crate::filter::ExtensionSet;
    use crate::pipeline::WatchSettings;
    use crate::session::memory::MemorySession;
    use crate::watcher::{watch_channels, WatchSenders};
    use std::fs;
    use std::io;
    use std::path::Path;
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Session whose `create` blocks until the test releases it
    struct StalledSession {
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl RemoteSession for StalledSession {
        type File = io::Sink;

        fn create(&mut self, _remote_path: &str) -> io::Result<io::Sink> {
            let _ = self.release.lock().unwrap().recv();
            Err(io::Error::new(io::ErrorKind::TimedOut, "released"))
        }

        fn close(&mut self, _file: io::Sink) -> io::Result<()> {
            Ok(())
        }
    }

    fn dispatcher(watch: &Path) -> (Dispatcher<MemorySession>, MemorySession, RecordingAlerts) {
        let session = MemorySession::default();
        let alerts = RecordingAlerts::default();
        let settings = WatchSettings::new(
            watch.to_path_buf(),
            ExtensionSet::new([".cmf"]),
            "/upload/".to_string(),
        );
        let pipeline = Pipeline::new(session.clone(), settings, Arc::new(alerts.clone()));
        (Dispatcher::new(pipeline), session, alerts)
    }

    /// Close both channels once everything queued has been received
    fn close_when_drained(senders: WatchSenders) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while !senders.events.is_empty() || !senders.errors.is_empty() {
                tokio::task::yield_now().await;
            }
            drop(senders);
        })
    }

    #[tokio::test]
    async fn test_starts_idle_and_terminates_on_close() {
        let tmp = TempDir::new().unwrap();
        let (mut dispatcher, _session, _alerts) = dispatcher(tmp.path());
        assert_eq!(dispatcher.state(), DispatcherState::Idle);

        let (senders, streams) = watch_channels(4);
        drop(senders);
        dispatcher.run(streams).await.unwrap();

        assert_eq!(dispatcher.state(), DispatcherState::Terminated);
    }

    #[tokio::test]
    async fn test_non_matching_event_does_nothing() {
        let tmp = TempDir::new().unwrap();
        let note = tmp.path().join("note.txt");
        fs::write(&note, b"hi").unwrap();
        let (mut dispatcher, session, alerts) = dispatcher(tmp.path());

        dispatcher.handle_event(WatchEvent::created(&note)).await.unwrap();

        assert!(session.create_calls().is_empty());
        assert!(note.exists());
        assert!(!tmp.path().join("processed").exists());
        assert!(alerts.alerts().is_empty());
        assert_eq!(dispatcher.stats().ignored, 1);
    }

    #[tokio::test]
    async fn test_only_create_events_are_handled() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.cmf");
        fs::write(&file, b"a").unwrap();
        let (mut dispatcher, session, _alerts) = dispatcher(tmp.path());

        let modify = WatchEvent {
            path: file.clone(),
            op: FileOp::Write,
        };
        dispatcher.handle_event(modify).await.unwrap();

        assert!(session.create_calls().is_empty());
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_event() {
        let tmp = TempDir::new().unwrap();
        let data = tmp.path().join("data.cmf");
        let next = tmp.path().join("next.cmf");
        fs::write(&data, b"data").unwrap();
        fs::write(&next, b"next").unwrap();
        let (mut dispatcher, session, alerts) = dispatcher(tmp.path());
        session.refuse("/upload/data.cmf");

        let (senders, streams) = watch_channels(4);
        senders.events.send(WatchEvent::created(&data)).await.unwrap();
        senders.events.send(WatchEvent::created(&next)).await.unwrap();
        let closer = close_when_drained(senders);
        dispatcher.run(streams).await.unwrap();
        closer.await.unwrap();

        assert!(data.exists());
        assert!(!tmp.path().join("processed/data.cmf").exists());
        assert_eq!(alerts.alerts().len(), 1);

        assert!(!next.exists());
        assert_eq!(session.file("/upload/next.cmf").unwrap(), b"next");
        assert_eq!(dispatcher.stats().failed, 1);
        assert_eq!(dispatcher.stats().delivered, 1);
        assert!(dispatcher.stats().last_delivery.is_some());
    }

    #[tokio::test]
    async fn test_watcher_error_is_alerted_and_loop_continues() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("late.cmf");
        fs::write(&file, b"late").unwrap();
        let (mut dispatcher, session, alerts) = dispatcher(tmp.path());

        let (senders, streams) = watch_channels(4);
        senders
            .errors
            .send(NotifierError {
                message: "inotify queue overflow".to_string(),
            })
            .await
            .unwrap();
        senders.events.send(WatchEvent::created(&file)).await.unwrap();

        let closer = close_when_drained(senders);
        dispatcher.run(streams).await.unwrap();
        closer.await.unwrap();

        assert_eq!(dispatcher.stats().notifier_errors, 1);
        assert_eq!(dispatcher.stats().delivered, 1);
        assert!(session.file("/upload/late.cmf").is_some());
        assert!(alerts.alerts()[0].message.contains("inotify queue overflow"));
    }

    #[tokio::test]
    async fn test_started_at_is_stamped_when_watching_begins() {
        let tmp = TempDir::new().unwrap();
        let (mut dispatcher, _session, _alerts) = dispatcher(tmp.path());
        let created = dispatcher.stats().started_at;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (senders, streams) = watch_channels(4);
        drop(senders);
        dispatcher.run(streams).await.unwrap();

        assert!(dispatcher.stats().started_at > created);
    }

    #[tokio::test]
    async fn test_interrupt_during_transfer_leaves_no_pipeline() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("slow.cmf");
        fs::write(&file, b"slow").unwrap();
        let (release_tx, release_rx) = mpsc::channel();
        let session = StalledSession {
            release: Mutex::new(release_rx),
        };
        let settings = WatchSettings::new(
            tmp.path().to_path_buf(),
            ExtensionSet::new([".cmf"]),
            "/upload/".to_string(),
        );
        let alerts = RecordingAlerts::default();
        let mut dispatcher = Dispatcher::new(Pipeline::new(session, settings, Arc::new(alerts)));

        let (senders, streams) = watch_channels(4);
        senders.events.send(WatchEvent::created(&file)).await.unwrap();
        let cancelled =
            tokio::time::timeout(Duration::from_millis(200), dispatcher.run(streams)).await;
        assert!(cancelled.is_err());

        dispatcher.interrupt();
        assert_eq!(dispatcher.state(), DispatcherState::Terminated);
        assert!(dispatcher.into_pipeline().is_none());

        release_tx.send(()).unwrap();
        drop(senders);
    }

    #[tokio::test]
    async fn test_pipeline_is_returned_after_clean_stop() {
        let tmp = TempDir::new().unwrap();
        let (mut dispatcher, _session, _alerts) = dispatcher(tmp.path());

        let (senders, streams) = watch_channels(4);
        drop(senders);
        dispatcher.run(streams).await.unwrap();
        dispatcher.interrupt();

        assert!(dispatcher.into_pipeline().is_some());
    }
}
