// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier CLI - Desktop alerts
//
// Alerts are always logged. With desktop alerts on, they are also queued to
// a background thread that hands each one to `notify-send`.

use async_channel::Receiver;
use sftp_courier_core::{Alert, AlertSink, ChannelAlerts, LogAlerts, Severity};
use std::io;
use std::process::{Child, Command};
use std::sync::Arc;
use std::thread::JoinHandle;

const ALERT_QUEUE: usize = 32;
const APP_NAME: &str = "SFTP Courier";

/// Background thread showing queued alerts
pub struct AlertEmitter {
    handle: JoinHandle<()>,
}

impl AlertEmitter {
    /// Wait for queued alerts to be shown. Every sink clone must be dropped
    /// first or this never returns.
    pub fn finish(self) {
        if self.handle.join().is_err() {
            tracing::error!("Alert thread panicked");
        }
    }
}

/// Build the alert sink for this run
pub fn start(desktop: bool) -> (Arc<dyn AlertSink>, Option<AlertEmitter>) {
    if !desktop {
        return (Arc::new(LogAlerts), None);
    }

    let (sink, rx) = ChannelAlerts::new(ALERT_QUEUE);
    let handle = std::thread::spawn(move || emit_loop(rx));
    (Arc::new(sink), Some(AlertEmitter { handle }))
}

fn urgency(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "low",
        Severity::Warning => "normal",
        Severity::Error => "critical",
    }
}

fn desktop_command(alert: &Alert) -> Command {
    let mut command = Command::new("notify-send");
    command
        .arg(format!("--urgency={}", urgency(alert.severity)))
        .arg(format!("--app-name={}", APP_NAME))
        .arg(&alert.title)
        .arg(&alert.message);
    command
}

fn emit_loop(rx: Receiver<Alert>) {
    let mut running: Vec<Child> = Vec::new();
    let mut enabled = true;

    while let Ok(alert) = rx.recv_blocking() {
        // Reap finished notifications
        running.retain_mut(|child| matches!(child.try_wait(), Ok(None)));

        if !enabled {
            continue;
        }
        match desktop_command(&alert).spawn() {
            Ok(child) => running.push(child),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("notify-send not found, desktop alerts disabled");
                enabled = false;
            }
            Err(e) => tracing::warn!("Failed to show desktop alert: {}", e),
        }
    }

    for mut child in running {
        let _ = child.wait();
    }
    tracing::debug!("Alert thread stopped");
}
