use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_per_page")]
    pub per_page_default: u32,
    #[serde(default = "default_per_page_max")]
    pub per_page_max: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            per_page_default: default_per_page(),
            per_page_max: default_per_page_max(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("trail.sqlite3")
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_owned()
}

const fn default_per_page() -> u32 {
    crate::page::DEFAULT_PER_PAGE
}

const fn default_per_page_max() -> u32 {
    crate::page::MAX_PER_PAGE
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a present-but-invalid file is an
    /// error (silent fallback would mask operator typos).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| {
            format!(
                "{}: parse config file {}",
                crate::error::ErrorCode::ConfigParseError,
                path.display()
            )
        })
    }
}
