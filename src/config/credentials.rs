//! Cached login cookies, one entry per account.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::api::SiteCookie;
use crate::config::loader::DEFAULT_FOLDER_NAME;
use crate::error::{Error, Result};

/// How long cached or pre-supplied cookies are trusted.
pub const CREDENTIAL_LIFETIME_DAYS: i64 = 180;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    accounts: BTreeMap<String, StoredCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    expires_at: DateTime<Utc>,
    cookies: Vec<SiteCookie>,
}

/// TOML-backed credential cache.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the platform configuration directory.
    pub fn default_location() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", DEFAULT_FOLDER_NAME)
            .ok_or_else(|| Error::Config("Cannot determine configuration directory".into()))?;
        Ok(Self::new(dirs.config_dir().join("credentials.toml")))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read unexpired cookies for an account. Absent or expired entries yield `None`.
    pub fn read(&self, account: &str) -> Result<Option<Vec<SiteCookie>>> {
        let file = self.load()?;
        Ok(file
            .accounts
            .get(account)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.cookies.clone()))
    }

    /// Cache cookies for an account, replacing any previous entry.
    pub fn write(&self, account: &str, cookies: &[SiteCookie]) -> Result<()> {
        let mut file = self.load()?;
        file.accounts.insert(
            account.to_string(),
            StoredCredential {
                expires_at: Utc::now() + Duration::days(CREDENTIAL_LIFETIME_DAYS),
                cookies: cookies.to_vec(),
            },
        );
        self.save(&file)
    }

    /// Drop the entry for an account, e.g. after the server rejected it.
    pub fn remove(&self, account: &str) -> Result<()> {
        let mut file = self.load()?;
        if file.accounts.remove(account).is_some() {
            self.save(&file)?;
        }
        Ok(())
    }

    fn load(&self) -> Result<CredentialFile> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, file: &CredentialFile) -> Result<()> {
        let content = toml::to_string_pretty(file)
            .map_err(|e| Error::Config(format!("Failed to serialize credentials: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::cookie_pair;

    #[test]
    fn test_missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.toml"));
        assert!(store.read("13800000000").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("sub").join("credentials.toml"));
        let cookies = cookie_pair("id", "secret");

        store.write("13800000000", &cookies).unwrap();
        assert_eq!(store.read("13800000000").unwrap(), Some(cookies));
        assert!(store.read("13900000000").unwrap().is_none());

        store.remove("13800000000").unwrap();
        assert!(store.read("13800000000").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        fs::write(
            &path,
            r#"[accounts.13800000000]
expires_at = "2000-01-01T00:00:00Z"

[[accounts.13800000000.cookies]]
name = "GCESS"
value = "old"
domain = ".geekbang.org"
"#,
        )
        .unwrap();

        let store = CredentialStore::new(path);
        assert!(store.read("13800000000").unwrap().is_none());
    }
}
