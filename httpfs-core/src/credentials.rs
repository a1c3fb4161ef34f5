//! API keys, sandbox directories and the immutable table mapping one to the other.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of leading characters of a key kept when it is rendered for logs.
const REDACTED_PREFIX: usize = 4;

/// Render a credential for log output without revealing it.
///
/// Keys longer than four characters keep their first four; shorter keys are
/// masked entirely.
#[must_use]
pub fn redact(key: &str) -> String {
    if key.chars().count() <= REDACTED_PREFIX {
        return "…".to_owned();
    }
    let prefix: String = key.chars().take(REDACTED_PREFIX).collect();
    format!("{prefix}…")
}

/// An opaque client credential.
///
/// `Debug` and `Display` both print the redacted form; use [`ApiKey::as_str`]
/// to get the raw value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw credential.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw credential.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ApiKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", redact(&self.0))
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(&self.0))
    }
}

/// A tenant's sandbox: a relative directory below the configured file root.
///
/// Construction rejects anything that could point outside the file root, so a
/// `SandboxDir` is always a plain sequence of normal path segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SandboxDir {
    name: String,
    path: PathBuf,
}

impl SandboxDir {
    /// Validate and wrap a sandbox directory name.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSandbox`] if `name` is empty, absolute,
    /// or contains a `..` segment.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let invalid = |reason| ConfigError::InvalidSandbox { dir: name.clone(), reason };

        let mut path = PathBuf::new();
        for component in Path::new(&name).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("parent directory segments are not allowed")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be relative to the file root"))
                }
            }
        }
        if path.as_os_str().is_empty() {
            return Err(invalid("must name a directory"));
        }
        Ok(Self { name, path })
    }

    /// The name as written in the config.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized relative path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

impl TryFrom<String> for SandboxDir {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SandboxDir> for String {
    fn from(dir: SandboxDir) -> Self {
        dir.name
    }
}

impl fmt::Display for SandboxDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Immutable mapping from API key to sandbox directory.
///
/// Keys are unique; several keys may share a sandbox.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    entries: BTreeMap<ApiKey, SandboxDir>,
}

impl CredentialTable {
    /// Build a table from its entries.
    #[must_use]
    pub fn new(entries: BTreeMap<ApiKey, SandboxDir>) -> Self {
        Self { entries }
    }

    /// Find the sandbox for a raw credential.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&SandboxDir> {
        self.entries.get(key)
    }

    /// Number of configured keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no keys are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ApiKey, SandboxDir)> for CredentialTable {
    fn from_iter<T: IntoIterator<Item = (ApiKey, SandboxDir)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox(name: &str) -> SandboxDir {
        match SandboxDir::new(name) {
            Ok(dir) => dir,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn sandbox_dir_accepts_nested_relative_names() {
        let dir = sandbox("tenants/./alpha");
        assert_eq!(dir.as_path(), Path::new("tenants/alpha"));
        assert_eq!(dir.name(), "tenants/./alpha", "name must keep the configured spelling");
    }

    #[test]
    fn sandbox_dir_rejects_escapes() {
        for name in ["", ".", "..", "../etc", "a/../../b", "/etc"] {
            assert!(
                matches!(SandboxDir::new(name), Err(ConfigError::InvalidSandbox { .. })),
                "'{name}' must be rejected"
            );
        }
    }

    #[test]
    fn credential_table_lookup_by_raw_key() {
        let table: CredentialTable = [
            (ApiKey::new("K1"), sandbox("tenantA")),
            (ApiKey::new("K2"), sandbox("tenantA")),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("K1").map(SandboxDir::name), Some("tenantA"));
        assert_eq!(table.lookup("K2").map(SandboxDir::name), Some("tenantA"));
        assert!(table.lookup("K3").is_none(), "unknown key must not resolve");
        assert!(table.lookup("").is_none());
    }

    #[test]
    fn api_key_formatting_is_redacted() {
        let key = ApiKey::new("SOME_KEY_1234");
        assert_eq!(key.to_string(), "SOME…");
        assert_eq!(format!("{key:?}"), "ApiKey(SOME…)");
        assert_eq!(key.as_str(), "SOME_KEY_1234");
        assert_eq!(redact("abc"), "…", "short keys must be fully masked");
    }
}
