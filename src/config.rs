use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::onedrive_service::http_client::GRAPH_API_BASE;

static SETTINGS_FILE_NAME: &str = "settings.json";

/// Upload session chunks must be a multiple of this many bytes.
pub const UPLOAD_CHUNK_ALIGNMENT: u64 = 320 * 1024;

pub struct ProjectConfig {
    pub settings: Settings,
    pub project_dirs: ProjectDirs,
}

impl ProjectConfig {
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "onedrive-pathfs", "onedrive-pathfs")
            .ok_or_else(|| anyhow!("Failed to get project directories"))?;
        for x in [proj_dirs.config_dir(), proj_dirs.cache_dir(), proj_dirs.data_dir()] {
            if !x.exists() {
                fs::create_dir_all(x).context("Failed to create project directory")?;
            }
        }

        let settings = Settings::new(&proj_dirs.config_dir().join(SETTINGS_FILE_NAME))?;
        Ok(Self {
            settings,
            project_dirs: proj_dirs,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Graph API
    pub api_base: String,
    /// Default log level, overridable on the command line
    pub log_level: String,
    pub fs: FsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: GRAPH_API_BASE.to_string(),
            log_level: "info".to_string(),
            fs: FsConfig::default(),
        }
    }
}

/// Tunables of the path filesystem core.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FsConfig {
    /// How long a resolved path stays cached
    pub lookup_ttl: Duration,
    /// How long a directory listing snapshot stays cached
    pub listing_ttl: Duration,
    /// Longest a read may wait for the next bytes
    pub stall_timeout: Duration,
    /// Interval of the expired-entry purge
    pub purge_interval: Duration,
    /// Content above this size is uploaded through an upload session
    pub large_upload_threshold: u64,
    pub upload_chunk_size: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            lookup_ttl: Duration::from_secs(60),
            listing_ttl: Duration::from_secs(5),
            stall_timeout: Duration::from_secs(15),
            purge_interval: Duration::from_secs(30),
            large_upload_threshold: 4 * 1024 * 1024,
            upload_chunk_size: 32 * UPLOAD_CHUNK_ALIGNMENT, // 10MB
        }
    }
}

impl FsConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("lookup_ttl", self.lookup_ttl),
            ("listing_ttl", self.listing_ttl),
            ("stall_timeout", self.stall_timeout),
            ("purge_interval", self.purge_interval),
        ] {
            if value.is_zero() {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if self.upload_chunk_size < UPLOAD_CHUNK_ALIGNMENT {
            return Err(anyhow!(
                "upload_chunk_size must be at least {} bytes",
                UPLOAD_CHUNK_ALIGNMENT
            ));
        }
        Ok(())
    }

    /// Chunk size rounded down to the required alignment
    pub fn aligned_chunk_size(&self) -> u64 {
        (self.upload_chunk_size / UPLOAD_CHUNK_ALIGNMENT).max(1) * UPLOAD_CHUNK_ALIGNMENT
    }
}

impl Settings {
    /// Load the settings file, writing the defaults if there is none yet.
    ///
    /// An existing file that cannot be parsed or validated is an error and
    /// is left as it is.
    pub fn new(config_file_path: &Path) -> Result<Self> {
        if !config_file_path.exists() {
            let default = Self::default();
            default
                .save_to_file(config_file_path)
                .context("Failed to write default settings")?;
            return Ok(default);
        }

        Self::load_settings_from_file(config_file_path).with_context(|| {
            format!("Invalid settings file {}", config_file_path.display())
        })
    }

    pub fn load_settings_from_file(config_file_path: &Path) -> Result<Self> {
        if !config_file_path.exists() {
            return Err(anyhow!("Config file not found"));
        }
        let data = fs::read_to_string(config_file_path)?;
        let settings: Self = serde_json::from_str(&data)?;
        settings.fs.validate()?;
        Ok(settings)
    }

    pub fn save_to_file(&self, config_file_path: &Path) -> Result<()> {
        if let Some(parent_path) = config_file_path.parent() {
            fs::create_dir_all(parent_path).context("Failed to create config directory")?;
        }

        let data = serde_json::to_string_pretty(self)?;
        fs::write(config_file_path, data)?;
        Ok(())
    }
}
