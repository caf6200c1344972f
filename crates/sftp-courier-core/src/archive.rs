// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Move-to-processed step
//
// The source is copied, then deleted. The copy always starts from the
// beginning of the file, whatever the upload step left the cursor at.

use crate::types::ArchiveError;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Create `dir` if it is missing. Returns `true` when it was created.
pub fn ensure_dir(dir: &Path) -> io::Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }

    match fs::create_dir(dir) {
        Ok(()) => Ok(true),
        // Lost a race with another creator
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copy the open `source` to `dest_path`, then delete `src_path`.
///
/// The destination is overwritten if present. The source is deleted only
/// after the whole copy succeeded; a failed delete keeps the copy.
pub fn relocate<R>(src_path: &Path, source: &mut R, dest_path: &Path) -> Result<u64, ArchiveError>
where
    R: Read + Seek + ?Sized,
{
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| ArchiveError::Copy {
            path: dest_path.to_path_buf(),
            source: e,
        })?;

    let mut dest = File::create(dest_path).map_err(|e| ArchiveError::Create {
        path: dest_path.to_path_buf(),
        source: e,
    })?;

    let bytes = io::copy(source, &mut dest).map_err(|e| ArchiveError::Copy {
        path: dest_path.to_path_buf(),
        source: e,
    })?;
    drop(dest);
    tracing::info!("File copied to 'processed' folder: {}", dest_path.display());

    fs::remove_file(src_path).map_err(|e| ArchiveError::Delete {
        path: src_path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes)
}
