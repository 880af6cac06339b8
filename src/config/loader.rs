//! Configuration structures and loading logic.

use crate::config::quality::VideoQuality;
use crate::download::FormatMask;
use crate::error::{Error, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Folder created under the home directory when no destination is given.
pub const DEFAULT_FOLDER_NAME: &str = "geektime-downloader";

/// Main configuration structure, threaded through every navigation step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Credentials only ever come from the command line.
    #[serde(skip)]
    pub account: AccountConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// How the user authenticates.
#[derive(Debug, Clone, Default)]
pub struct AccountConfig {
    /// Account (phone number) for password login.
    pub phone: Option<String>,

    /// Pre-supplied GCID cookie value.
    pub gcid: Option<String>,

    /// Pre-supplied GCESS cookie value.
    pub gcess: Option<String>,
}

/// Resolved authentication method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Password login for an account, consulting the credential cache first.
    Account(String),
    /// Pre-supplied cookie pair.
    CookiePair { gcid: String, gcess: String },
}

/// Download options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Base directory for downloads.
    #[serde(default)]
    pub download_folder: Option<PathBuf>,

    /// Video quality.
    #[serde(default)]
    pub quality: VideoQuality,

    /// Whether rendered documents include the first page of comments.
    #[serde(default = "default_true")]
    pub comments: bool,

    /// Whether product ids refer to training programs.
    #[serde(default)]
    pub university: bool,

    /// Column output bits (1 document, 2 text, 4 audio).
    #[serde(default = "default_output")]
    pub output: u8,

    /// Product to download without prompting.
    #[serde(default)]
    pub product_id: Option<i64>,

    /// Whether loading a product immediately downloads all of its items.
    #[serde(default = "default_true")]
    pub download_all: bool,

    /// Show the rendering session and enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Proxy for the rendering session.
    #[serde(default)]
    pub proxy: Option<String>,

    /// Parallelism hint handed to the content engines.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            download_folder: None,
            quality: VideoQuality::default(),
            comments: true,
            university: false,
            output: default_output(),
            product_id: None,
            download_all: true,
            debug: false,
            proxy: None,
            concurrency: default_concurrency(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output() -> u8 {
    FormatMask::DOCUMENT.bits()
}

/// Half the available processing units, rounded up.
pub fn default_concurrency() -> usize {
    num_cpus::get().div_ceil(2).max(1)
}

/// Default location of the settings file.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", DEFAULT_FOLDER_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicitly given file, or the default one when it exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Get the effective download directory.
    pub fn download_folder(&self) -> PathBuf {
        self.options.download_folder.clone().unwrap_or_else(|| {
            BaseDirs::new()
                .map(|dirs| dirs.home_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DEFAULT_FOLDER_NAME)
        })
    }

    /// Resolve the authentication method.
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.account.phone, &self.account.gcid, &self.account.gcess) {
            (Some(phone), None, None) if !phone.trim().is_empty() => {
                Ok(Credentials::Account(phone.trim().to_string()))
            }
            (None, Some(gcid), Some(gcess)) if !gcid.is_empty() && !gcess.is_empty() => {
                Ok(Credentials::CookiePair {
                    gcid: gcid.clone(),
                    gcess: gcess.clone(),
                })
            }
            (Some(_), _, _) => Err(Error::validation(
                "phone",
                "An account cannot be combined with the gcid/gcess cookie pair",
            )),
            _ => Err(Error::validation(
                "phone",
                "Provide either an account or both gcid and gcess cookie values",
            )),
        }
    }

    /// Name of the per-account folder under the download directory.
    pub fn account_identity(&self) -> Result<String> {
        Ok(match self.credentials()? {
            Credentials::Account(phone) => phone,
            Credentials::CookiePair { gcid, .. } => gcid,
        })
    }

    /// Requested column output formats.
    pub fn format_mask(&self) -> Result<FormatMask> {
        FormatMask::parse_requested(self.options.output)
    }
}
