use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "govcal.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "GOVCAL_CONFIG_PATH";

pub const DEFAULT_PORTAL_URL: &str = "https://data.gov.tw/dataset/14718";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub url: String,
    pub user_agent: String,
    /// The portal has served broken certificate chains before. Turning this
    /// off restores normal TLS verification.
    pub accept_invalid_certs: bool,
    /// Optional URL probed during the environment check; failure only warns.
    pub connectivity_probe_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub page_timeout_secs: u64,
    pub page_attempts: u32,
    pub page_retry_delay_ms: u64,
    pub download_timeout_secs: u64,
    pub download_attempts: u32,
    pub download_retry_delay_ms: u64,
    pub pacing_delay_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PORTAL_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
            connectivity_probe_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { staging_dir: PathBuf::from("origin"), output_dir: PathBuf::from("docs") }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 30,
            page_attempts: 3,
            page_retry_delay_ms: 2000,
            download_timeout_secs: 60,
            download_attempts: 3,
            download_retry_delay_ms: 3000,
            pacing_delay_ms: 1000,
        }
    }
}

impl NetworkConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn page_retry_delay(&self) -> Duration {
        Duration::from_millis(self.page_retry_delay_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn download_retry_delay(&self) -> Duration {
        Duration::from_millis(self.download_retry_delay_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Same attempt counts with every delay removed. Used by tests and dry runs.
    pub fn without_delays(mut self) -> Self {
        self.page_retry_delay_ms = 0;
        self.download_retry_delay_ms = 0;
        self.pacing_delay_ms = 0;
        self
    }
}

impl Config {
    /// Load configuration, searching in order: the explicit path, the
    /// `GOVCAL_CONFIG_PATH` variable, `govcal.toml` in the working directory,
    /// then the per-user config directory. Falls back to defaults when none
    /// of them exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from(Path::new(&path));
            }
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(&local);
        }

        if let Some(user_path) = user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("Config file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("tw", "gov-calendar", "gov-calendar")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
