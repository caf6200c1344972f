// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Startup scan
//
// Files already sitting in the watch folder are handled once at startup.
// Unlike the live path, a failed upload does not stop the archive step.

use crate::pipeline::Pipeline;
use crate::session::RemoteSession;
use crate::types::{CourierError, FileError, ScanError, ScanReport};
use std::fs::{self, File};
use std::path::PathBuf;

/// Qualifying direct children of the watch folder, sorted by name
fn qualifying_entries<S: RemoteSession>(pipeline: &Pipeline<S>) -> Result<Vec<PathBuf>, ScanError> {
    let dir = &pipeline.settings().watch_dir;
    let entries = fs::read_dir(dir).map_err(|source| ScanError::ReadDir {
        path: dir.clone(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| pipeline.qualifies(path))
        .collect();

    paths.sort();
    Ok(paths)
}

/// Upload and archive every qualifying file already in the watch folder.
///
/// Only a failure to list the folder is returned; per-file failures are
/// reported through the pipeline and counted.
pub fn scan_existing<S: RemoteSession>(pipeline: &mut Pipeline<S>) -> Result<ScanReport, ScanError> {
    let mut report = ScanReport::default();

    for path in qualifying_entries(pipeline)? {
        report.qualifying += 1;

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(source) => {
                pipeline.report_failure(&FileError::Open { path, source });
                report.failures += 1;
                continue;
            }
        };

        match pipeline.upload(&path, &mut file) {
            Ok(_) => report.uploaded += 1,
            Err(err) => {
                pipeline.report_failure(&err);
                report.failures += 1;
            }
        }

        match pipeline.archive(&path, &mut file) {
            Ok(_) => report.archived += 1,
            Err(err) => {
                pipeline.report_failure(&err);
                report.failures += 1;
            }
        }
    }

    tracing::info!(
        "Processed existing files: {} found, {} uploaded, {} archived, {} failures",
        report.qualifying,
        report.uploaded,
        report.archived,
        report.failures
    );
    Ok(report)
}

/// Run [`scan_existing`] on the blocking pool, handing the pipeline back
pub async fn scan_in_background<S: RemoteSession>(
    mut pipeline: Pipeline<S>,
) -> Result<(Pipeline<S>, Result<ScanReport, ScanError>), CourierError> {
    tokio::task::spawn_blocking(move || {
        let result = scan_existing(&mut pipeline);
        (pipeline, result)
    })
    .await
    .map_err(|e| CourierError::Runtime(format!("Startup scan task failed: {}", e)))
}
