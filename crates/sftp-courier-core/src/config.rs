// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Configuration
//
// Settings come from an INI file with [paths], [server] and [general]
// sections. Absent keys fall back to empty values; nothing is validated
// beyond what is needed to parse the port.

use crate::filter::ExtensionSet;
use crate::pipeline::WatchSettings;
use crate::types::ConfigError;
use config::{Config, File, FileFormat, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up by default
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

pub const DEFAULT_SFTP_PORT: u16 = 22;

/// How the courier authenticates against the server
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    PrivateKey(PathBuf),
    Password(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey(path) => f.debug_tuple("PrivateKey").field(path).finish(),
            Self::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Settings loaded once at startup
#[derive(Clone)]
pub struct CourierConfig {
    pub folder_to_watch: PathBuf,
    pub private_key_path: String,
    pub sftp_server: String,
    pub sftp_port: u16,
    pub sftp_user: String,
    pub sftp_password: String,
    pub destination_folder: String,
    pub watch_extensions: ExtensionSet,
}

impl fmt::Debug for CourierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierConfig")
            .field("folder_to_watch", &self.folder_to_watch)
            .field("private_key_path", &self.private_key_path)
            .field("sftp_server", &self.sftp_server)
            .field("sftp_port", &self.sftp_port)
            .field("sftp_user", &self.sftp_user)
            .field("destination_folder", &self.destination_folder)
            .field("watch_extensions", &self.watch_extensions)
            .finish_non_exhaustive()
    }
}

/// One INI section with case-insensitive key lookup
struct Section(Map<String, Value>);

impl Section {
    fn read(source: &Config, name: &str) -> Self {
        Self(source.get_table(name).unwrap_or_default())
    }

    fn get(&self, key: &str) -> String {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.clone().into_string().ok())
            .unwrap_or_default()
    }
}

impl CourierConfig {
    /// Load settings from an INI file on disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let source = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini))
            .build()?;

        let config = Self::from_source(&source)?;
        tracing::info!(
            "Using config: {:?} (watching {:?}, extensions: {})",
            path,
            config.folder_to_watch,
            config.watch_extensions.len()
        );
        Ok(config)
    }

    /// Parse settings from INI text
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let source = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?;
        Self::from_source(&source)
    }

    fn from_source(source: &Config) -> Result<Self, ConfigError> {
        let paths = Section::read(source, "paths");
        let server = Section::read(source, "server");
        let general = Section::read(source, "general");

        let port = server.get("SftpPort");
        let sftp_port = match port.trim() {
            "" => DEFAULT_SFTP_PORT,
            value => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "server.SftpPort".to_string(),
                value: port.clone(),
            })?,
        };

        Ok(Self {
            folder_to_watch: PathBuf::from(paths.get("FolderToWatch")),
            private_key_path: paths.get("PrivateKeyPath"),
            sftp_server: server.get("SftpServer"),
            sftp_port,
            sftp_user: server.get("SftpUser"),
            sftp_password: server.get("SftpPassword"),
            destination_folder: server.get("DestinationFolder"),
            watch_extensions: ExtensionSet::parse_list(&general.get("WatchFileExtension")),
        })
    }

    /// Where handled files are moved to
    pub fn processed_folder(&self) -> PathBuf {
        self.watch_settings().processed_dir
    }

    /// A non-empty key path selects key authentication, otherwise password
    pub fn credentials(&self) -> Credentials {
        if self.private_key_path.is_empty() {
            Credentials::Password(self.sftp_password.clone())
        } else {
            Credentials::PrivateKey(PathBuf::from(&self.private_key_path))
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.sftp_server, self.sftp_port)
    }

    pub fn watch_settings(&self) -> WatchSettings {
        WatchSettings::new(
            self.folder_to_watch.clone(),
            self.watch_extensions.clone(),
            self.destination_folder.clone(),
        )
    }
}

/// Find the configuration file to use.
///
/// An explicit path must exist. Otherwise `config.ini` in `working_dir` wins,
/// then `config.ini` in the per-user config directory.
pub fn discover_config_path(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ConfigError::NotFound(path.to_path_buf()))
        };
    }

    let local = working_dir.join(DEFAULT_CONFIG_FILE);
    if local.is_file() {
        return Ok(local);
    }

    if let Some(dirs) = directories::ProjectDirs::from("org", "sftp-courier", "sftp-courier") {
        let user = dirs.config_dir().join(DEFAULT_CONFIG_FILE);
        if user.is_file() {
            tracing::info!("Using per-user config file: {:?}", user);
            return Ok(user);
        }
    }

    Err(ConfigError::NotFound(local))
}
