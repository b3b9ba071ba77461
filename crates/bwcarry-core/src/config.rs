use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Problems loading or validating `config.toml`. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("locate XDG directories: {0}")]
    Xdg(String),
}

/// Panel endpoint and admin credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Admin API endpoint, e.g. `https://panel.example.net:4085/index.php`.
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Transport bounds per call (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Overall per-call timeout; a hung call holds its worker slot until this expires.
    pub timeout_secs: u64,
    pub max_redirections: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 60,
            max_redirections: 5,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Inventory pagination parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// The panel's page size; a single-shot result at or below this may be truncated.
    pub page_size: u32,
    /// Hard ceiling on pages requested during a pagination sweep.
    pub max_pages: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 200,
        }
    }
}

/// Where the verbose and change logs go. Defaults to the XDG state dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Global configuration loaded from `~/.config/bwcarry/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarryConfig {
    pub panel: PanelConfig,
    /// Worker pool size.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Start with TLS certificate verification disabled.
    #[serde(default)]
    pub insecure: bool,
    /// Log response bodies (redacted and truncated).
    #[serde(default)]
    pub log_responses: bool,
    #[serde(default = "default_response_log_max_chars")]
    pub response_log_max_chars: usize,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

fn default_parallelism() -> usize {
    5
}

fn default_response_log_max_chars() -> usize {
    2000
}

impl CarryConfig {
    /// Parse and validate TOML text. `origin` is only used in error messages.
    pub fn from_toml_str(data: &str, origin: &Path) -> Result<Self, ConfigError> {
        let cfg: CarryConfig = toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs that cannot drive a run: missing endpoint or credentials, zero workers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.panel.url.trim().is_empty() {
            return Err(ConfigError::Invalid("panel.url is empty".into()));
        }
        url::Url::parse(self.panel.url.trim())
            .map_err(|e| ConfigError::Invalid(format!("panel.url: {}", e)))?;
        if self.panel.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("panel.api_key is empty".into()));
        }
        if self.panel.api_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("panel.api_secret is empty".into()));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid("parallelism must be at least 1".into()));
        }
        if self.inventory.page_size == 0 {
            return Err(ConfigError::Invalid("inventory.page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Directory holding the verbose and change logs.
    pub fn logs_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.logs.dir {
            Some(dir) => Ok(dir.clone()),
            None => state_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let xdg_dirs =
        xdg::BaseDirectories::with_prefix("bwcarry").map_err(|e| ConfigError::Xdg(e.to_string()))?;
    Ok(xdg_dirs.get_config_file("config.toml"))
}

/// `~/.local/state/bwcarry`, created if needed.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    let xdg_dirs =
        xdg::BaseDirectories::with_prefix("bwcarry").map_err(|e| ConfigError::Xdg(e.to_string()))?;
    xdg_dirs
        .create_state_directory("")
        .map_err(|e| ConfigError::Xdg(e.to_string()))
}

/// Load configuration from `path`, or from the XDG default location.
///
/// Never writes a file: a missing config is an error for the caller to report.
pub fn load(path: Option<&Path>) -> Result<CarryConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        return Err(ConfigError::Missing(path));
    }
    let data = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let cfg = CarryConfig::from_toml_str(&data, &path)?;
    tracing::debug!(
        path = %path.display(),
        parallelism = cfg.parallelism,
        insecure = cfg.insecure,
        "loaded config"
    );
    Ok(cfg)
}
