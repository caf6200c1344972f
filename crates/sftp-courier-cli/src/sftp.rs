// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier CLI - SSH/SFTP session
//
// One session is opened at startup and kept for the life of the process.
// The server host key is not checked against known_hosts.

use sftp_courier_core::{CourierConfig, CourierError, Credentials, RemoteSession};
use ssh2::{HashType, Session, Sftp};
use std::io;
use std::net::TcpStream;
use std::path::Path;

pub struct SftpSession {
    sftp: Sftp,
    // Must outlive the SFTP channel
    _session: Session,
}

impl RemoteSession for SftpSession {
    type File = ssh2::File;

    fn create(&mut self, remote_path: &str) -> io::Result<ssh2::File> {
        self.sftp.create(Path::new(remote_path)).map_err(io::Error::from)
    }

    // Dropping an ssh2::File discards the close result
    fn close(&mut self, mut file: ssh2::File) -> io::Result<()> {
        file.close().map_err(io::Error::from)
    }
}

fn connection_error(context: &str, err: impl std::fmt::Display) -> CourierError {
    CourierError::Connection(format!("{}: {}", context, err))
}

/// Colon-separated lowercase hex
fn fingerprint(hash: &[u8]) -> String {
    hash.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Open an authenticated SFTP session to the configured server
pub fn connect(config: &CourierConfig) -> Result<SftpSession, CourierError> {
    let address = config.server_address();
    tracing::info!("Connecting to {} as {}", address, config.sftp_user);

    let tcp = TcpStream::connect(&address)
        .map_err(|e| connection_error(&format!("Failed to connect to {}", address), e))?;

    let mut session =
        Session::new().map_err(|e| connection_error("Failed to create SSH session", e))?;
    session.set_tcp_stream(tcp);
    session
        .handshake()
        .map_err(|e| connection_error("SSH handshake failed", e))?;

    match session.host_key_hash(HashType::Sha256) {
        Some(hash) => tracing::warn!(
            "Host key for {} is not verified (SHA256 {})",
            address,
            fingerprint(hash)
        ),
        None => tracing::warn!("Host key for {} is not verified", address),
    }

    match config.credentials() {
        Credentials::PrivateKey(key_path) => {
            if !key_path.is_file() {
                return Err(CourierError::Connection(format!(
                    "Private key not found: {}",
                    key_path.display()
                )));
            }
            tracing::debug!("Authenticating with key {}", key_path.display());
            session
                .userauth_pubkey_file(&config.sftp_user, None, &key_path, None)
                .map_err(|e| connection_error("Key authentication failed", e))?;
        }
        Credentials::Password(password) => {
            tracing::debug!("Authenticating with password");
            session
                .userauth_password(&config.sftp_user, &password)
                .map_err(|e| connection_error("Password authentication failed", e))?;
        }
    }

    if !session.authenticated() {
        return Err(CourierError::Connection(format!(
            "Server {} did not accept the credentials for {}",
            address, config.sftp_user
        )));
    }

    let sftp = session
        .sftp()
        .map_err(|e| connection_error("Failed to start SFTP subsystem", e))?;

    tracing::info!("Connected to SFTP server {}", address);
    Ok(SftpSession {
        sftp,
        _session: session,
    })
}

/// Run [`connect`] on the blocking pool
pub async fn connect_in_background(config: CourierConfig) -> Result<SftpSession, CourierError> {
    tokio::task::spawn_blocking(move || connect(&config))
        .await
        .map_err(|e| CourierError::Runtime(format!("Connection task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_format() {
        assert_eq!(fingerprint(&[0x00, 0xab, 0x10]), "00:ab:10");
        assert_eq!(fingerprint(&[]), "");
    }

    #[test]
    fn test_missing_server_is_connection_error() {
        let mut config = sftp_courier_core::CourierConfig::from_ini_str(
            "[server]\nSftpServer = 127.0.0.1\nSftpPort = 1\n",
        )
        .unwrap();
        config.sftp_user = "nobody".to_string();

        let err = connect(&config).err().unwrap();
        assert!(matches!(err, CourierError::Connection(_)));
    }
}
