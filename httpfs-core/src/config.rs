//! Server configuration and its JSON document shape.
//!
//! The document uses PascalCase keys:
//!
//! ```json
//! {
//!   "Address": ":443",
//!   "FileRoot": "files",
//!   "TLSCertPath": "path/to/certificate",
//!   "TLSKeyPath": "path/to/key",
//!   "APIKeys": {
//!     "SOME_KEY_1234": "hamburger",
//!     "ANOTHER_KEY_0987": "hotdog"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::credentials::{ApiKey, CredentialTable, SandboxDir};
use crate::error::ConfigError;

/// Port used by the default template.
const HTTPS_PORT: u16 = 443;

/// Settings for one server process. Loaded once, never mutated while serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Config {
    /// `host:port` to listen on. `:port` listens on all interfaces.
    #[serde(rename = "Address")]
    pub address: String,

    /// Directory holding every tenant's sandbox.
    #[serde(rename = "FileRoot")]
    pub file_root: PathBuf,

    /// PEM certificate; TLS is used only when both paths are set.
    #[serde(rename = "TLSCertPath", default, skip_serializing_if = "Option::is_none")]
    pub tls_cert_path: Option<PathBuf>,

    /// PEM private key.
    #[serde(rename = "TLSKeyPath", default, skip_serializing_if = "Option::is_none")]
    pub tls_key_path: Option<PathBuf>,

    /// API key to sandbox directory.
    #[serde(rename = "APIKeys", default)]
    pub api_keys: BTreeMap<ApiKey, SandboxDir>,
}

impl Config {
    /// Create a plaintext config with no keys.
    #[must_use]
    pub fn new(address: impl Into<String>, file_root: impl Into<PathBuf>) -> Self {
        Self {
            address: address.into(),
            file_root: file_root.into(),
            tls_cert_path: None,
            tls_key_path: None,
            api_keys: BTreeMap::new(),
        }
    }

    /// Add a key, replacing any sandbox it was previously mapped to.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>, sandbox: SandboxDir) -> Self {
        self.api_keys.insert(ApiKey::new(key), sandbox);
        self
    }

    /// Set the TLS certificate and key paths.
    #[must_use]
    pub fn with_tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls_cert_path = Some(cert.into());
        self.tls_key_path = Some(key.into());
        self
    }

    /// A populated sample to copy and edit.
    ///
    /// # Panics
    /// Panics if the built-in sample sandbox name fails validation.
    #[must_use]
    pub fn default_template() -> Self {
        #[expect(clippy::expect_used, reason = "constant sandbox name is always valid")]
        let sandbox = SandboxDir::new("dir_for_this_key").expect("template sandbox name is valid");
        Self::new(format!(":{HTTPS_PORT}"), "files")
            .with_tls("path/to/certificate", "path/to/key")
            .with_key("api_key", sandbox)
    }

    /// Read and validate a config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid document, including when a
    /// sandbox directory fails validation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Write the config as indented JSON, creating the file with mode `0644`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Write`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let data = serde_json::to_vec_pretty(self).map_err(ConfigError::Serialize)?;
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_owned(),
            source,
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(crate::FILE_MODE);
        }
        let mut file = options.open(path).map_err(write_err)?;
        file.write_all(&data).map_err(write_err)?;
        Ok(())
    }

    /// Resolve [`Config::address`] into a socket address.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidAddress`] if the address does not parse
    /// or resolves to nothing.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = self.address.trim();
        let candidate = if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_owned()
        };
        let invalid = |reason: String| ConfigError::InvalidAddress {
            address: self.address.clone(),
            reason,
        };
        candidate
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("no addresses resolved".to_owned()))
    }

    /// Certificate and key paths, when both are set and non-empty.
    #[must_use]
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        let cert = self.tls_cert_path.as_deref().filter(|p| !p.as_os_str().is_empty())?;
        let key = self.tls_key_path.as_deref().filter(|p| !p.as_os_str().is_empty())?;
        Some((cert, key))
    }

    /// Build the credential table.
    #[must_use]
    pub fn credentials(&self) -> CredentialTable {
        CredentialTable::new(self.api_keys.clone())
    }
}
