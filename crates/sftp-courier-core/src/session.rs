// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Remote session seam
//
// The pipeline only needs to create a file on the remote side and write
// into it. The SSH/SFTP client behind this lives in the CLI crate.

use std::io::{self, Write};

/// An authenticated handle to the remote file-transfer endpoint
pub trait RemoteSession: Send + 'static {
    /// Writable remote file
    type File: Write;

    /// Create (or truncate) the file at `remote_path`
    fn create(&mut self, remote_path: &str) -> io::Result<Self::File>;

    /// Close a file returned by `create`. The upload only counts once this
    /// succeeds.
    fn close(&mut self, file: Self::File) -> io::Result<()>;
}
