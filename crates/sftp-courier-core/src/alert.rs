// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Alerts
//
// Alerts are fire-and-forget. A sink records the alert on the console and
// may hand it to something slower (a desktop notification), but it never
// makes the caller wait.

use async_channel::{Receiver, Sender, TrySendError};

/// How loudly an alert should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Error)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Severity::Warning)
    }
}

/// Somewhere to send alerts. Implementations must not block.
pub trait AlertSink: Send + Sync {
    fn alert(&self, alert: Alert);
}

fn log_alert(alert: &Alert) {
    match alert.severity {
        Severity::Info => tracing::info!("{}: {}", alert.title, alert.message),
        Severity::Warning => tracing::warn!("{}: {}", alert.title, alert.message),
        Severity::Error => tracing::error!("{}: {}", alert.title, alert.message),
    }
}

/// Console-only alerts
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn alert(&self, alert: Alert) {
        log_alert(&alert);
    }
}

/// Logs each alert and queues it for a background consumer.
///
/// When the queue is full the alert is dropped; it has already been logged.
#[derive(Debug, Clone)]
pub struct ChannelAlerts {
    tx: Sender<Alert>,
}

impl ChannelAlerts {
    pub fn new(capacity: usize) -> (Self, Receiver<Alert>) {
        let (tx, rx) = async_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelAlerts {
    fn alert(&self, alert: Alert) {
        log_alert(&alert);
        match self.tx.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                tracing::warn!("Alert queue full, dropping alert: {}", alert.title);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Alert consumer has stopped");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{Alert, AlertSink};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingAlerts {
        alerts: Arc<Mutex<Vec<Alert>>>,
    }

    impl RecordingAlerts {
        pub fn alerts(&self) -> Vec<Alert> {
            self.alerts.lock().unwrap().clone()
        }
    }

    impl AlertSink for RecordingAlerts {
        fn alert(&self, alert: Alert) {
            self.alerts.lock().unwrap().push(alert);
        }
    }
}
