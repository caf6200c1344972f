// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Upload step

use crate::session::RemoteSession;
use crate::types::TransferError;
use std::io::{self, Read, Write};
use std::path::Path;

/// Remote path for a local file: the prefix followed by the base name.
///
/// This is plain concatenation, so the prefix must carry its own trailing
/// separator if one is wanted.
pub fn remote_path_for(local_path: &Path, destination_prefix: &str) -> String {
    let base_name = local_path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    format!("{}{}", destination_prefix, base_name)
}

/// Upload `local` to a new remote file and return the number of bytes sent.
///
/// Copies from the reader's current position to its end. A failed copy
/// leaves whatever was written on the remote side. The local reader stays
/// open; the remote handle is flushed and closed here, and a failed close
/// fails the upload.
pub fn upload<S, R>(
    local_path: &Path,
    local: &mut R,
    session: &mut S,
    destination_prefix: &str,
) -> Result<u64, TransferError>
where
    S: RemoteSession,
    R: Read + ?Sized,
{
    let remote_path = remote_path_for(local_path, destination_prefix);
    tracing::info!("Creating remote file: {}", remote_path);

    let mut remote = session
        .create(&remote_path)
        .map_err(|source| TransferError::RemoteCreate {
            path: remote_path.clone(),
            source,
        })?;

    let bytes = io::copy(local, &mut remote)
        .and_then(|bytes| remote.flush().map(|_| bytes))
        .map_err(|source| TransferError::Copy {
            path: remote_path.clone(),
            source,
        })?;
    session
        .close(remote)
        .map_err(|source| TransferError::Close {
            path: remote_path.clone(),
            source,
        })?;

    tracing::info!("File uploaded successfully: {} ({} bytes)", remote_path, bytes);
    Ok(bytes)
}
