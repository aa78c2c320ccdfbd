//! Configuration management for Manga Fetcher
//!
//! Settings are layered: built-in defaults, then a TOML file, then environment
//! variables, then command-line flags (applied by the CLI handlers).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, Endpoints, NameOptions, SchedulerConfig, SchedulingMode};
use crate::constants::{config, endpoints, env, files, http, limits, logging, scheduler};
use crate::errors::{ConfigError, ConfigResult};

/// Where a loaded configuration came from
///
/// `AppConfig::load` runs before the log subscriber exists, so it records its
/// choices here and the caller reports them with [`ConfigSource::log`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    /// File that was read, if any
    pub path: Option<PathBuf>,
    /// Environment variables that replaced configured values
    pub overrides: Vec<&'static str>,
}

impl ConfigSource {
    pub fn log(&self) {
        match &self.path {
            Some(path) => info!("Loaded configuration from: {}", path.display()),
            None => debug!("No config file found, using built-in defaults"),
        }
        for key in &self.overrides {
            debug!("Configuration overridden by {}", key);
        }
    }
}

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Chapter scheduling settings
    pub scheduler: SchedulerConfigToml,
    /// Output layout and naming
    pub library: LibraryConfig,
    /// Remote endpoint templates
    pub endpoints: EndpointsConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP keep-alive interval in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Replays of a 429/503 response
    pub throttle_retries: u32,
    /// User agent override
    pub user_agent: Option<String>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_keepalive_secs: Some(http::TCP_KEEPALIVE.as_secs()),
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            throttle_retries: limits::DEFAULT_THROTTLE_RETRIES,
            user_agent: None,
        }
    }
}

/// TOML-friendly scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigToml {
    /// Requests allowed in flight across all chapters
    pub max_connections: usize,
    /// Chapters per wave (workers in pool mode)
    pub wave_size: usize,
    /// "waves" or "worker-pool"
    pub mode: SchedulingMode,
    /// Page ceiling when a chapter advertises no page count
    pub max_pages: u32,
    /// Re-download pages already on disk
    pub overwrite_existing: bool,
}

impl Default for SchedulerConfigToml {
    fn default() -> Self {
        Self {
            max_connections: scheduler::DEFAULT_MAX_CONNECTIONS,
            wave_size: scheduler::DEFAULT_WAVE_SIZE,
            mode: SchedulingMode::Waves,
            max_pages: files::MAX_PAGE_INDEX,
            overwrite_existing: false,
        }
    }
}

/// Output layout and series naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding one folder per series
    pub root: PathBuf,
    /// Download history file
    pub history_file: PathBuf,
    /// Upper-case series names instead of title-casing them
    pub uppercase: bool,
    /// Use series names exactly as typed
    pub edit_mode: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(files::DEFAULT_LIBRARY_ROOT),
            history_file: PathBuf::from(files::DEFAULT_HISTORY_FILE),
            uppercase: false,
            edit_mode: false,
        }
    }
}

impl LibraryConfig {
    pub fn name_options(&self) -> NameOptions {
        NameOptions {
            uppercase: self.uppercase,
            edit_mode: self.edit_mode,
        }
    }
}

/// TOML-friendly endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfigToml {
    /// Base URL of the chapter lookup pages
    pub lookup_base: String,
    /// Scheme used for page images
    pub image_scheme: String,
}

impl Default for EndpointsConfigToml {
    fn default() -> Self {
        Self {
            lookup_base: endpoints::DEFAULT_LOOKUP_BASE.to_string(),
            image_scheme: endpoints::DEFAULT_IMAGE_SCHEME.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level, used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the scheduler settings or the
    /// lookup base URL are invalid
    pub fn to_runtime_config(&self) -> ConfigResult<(ClientConfig, SchedulerConfig, Endpoints)> {
        let scheduler = self.scheduler.to_runtime_config();
        scheduler
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "scheduler".to_string(),
                value: format!(
                    "wave_size={}, max_connections={}, max_pages={}",
                    scheduler.wave_size, scheduler.max_connections, scheduler.max_pages
                ),
                reason,
            })?;

        Ok((
            self.client.to_runtime_config(),
            scheduler,
            self.endpoints.to_runtime_config()?,
        ))
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    ///
    /// Command-line flags are applied on top by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if an explicitly given file does not
    /// exist and `ConfigError::InvalidFormat` if the file is not valid TOML
    pub async fn load(
        config_file_override: Option<PathBuf>,
    ) -> ConfigResult<(Self, ConfigSource)> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let mut config = match &config_path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::default(),
        };

        let overrides = config.apply_overrides(|key| std::env::var(key).ok());
        Ok((
            config,
            ConfigSource {
                path: config_path,
                overrides,
            },
        ))
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// Returns the keys that were applied; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut applied = Vec::new();

        if let Some(root) = non_empty(env::ROOT) {
            self.library.root = PathBuf::from(root);
            applied.push(env::ROOT);
        }
        if let Some(history) = non_empty(env::HISTORY) {
            self.library.history_file = PathBuf::from(history);
            applied.push(env::HISTORY);
        }
        if let Some(base) = non_empty(env::LOOKUP_URL) {
            self.endpoints.lookup_base = base;
            applied.push(env::LOOKUP_URL);
        }
        applied
    }

    /// Write the default configuration file
    ///
    /// Writes to `path`, or to the per-user location when `path` is `None`.
    /// An existing file is left untouched unless `force` is set. Returns the
    /// path and whether a file was written.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the directory or file cannot be written
    pub async fn initialize(path: Option<PathBuf>, force: bool) -> ConfigResult<(PathBuf, bool)> {
        let config_path = path.unwrap_or_else(Self::default_config_path);

        if config_path.exists() && !force {
            debug!("Config file already exists: {}", config_path.display());
            return Ok((config_path, false));
        }

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content()).await?;
        info!("Wrote default configuration to {}", config_path.display());

        Ok((config_path, true))
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if serialization fails
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let search_paths = [
            PathBuf::from(config::LOCAL_CONFIG_FILE),
            Self::default_config_path(),
        ];

        search_paths.into_iter().find(|path| path.exists())
    }

    /// Per-user config file, falling back to the project-local file when the
    /// platform has no config directory
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(config::CONFIG_DIR_NAME).join(config::CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(config::LOCAL_CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Manga Fetcher Configuration
# Every setting is optional; missing values fall back to the defaults below.

[client]
tcp_keepalive_secs = {keepalive}
tcp_nodelay = true
pool_idle_timeout_secs = {idle}
request_timeout_secs = {timeout}
connect_timeout_secs = {connect}
rate_limit_rps = {rps}
# Replays of an HTTP 429/503 answer before the page counts as failed
throttle_retries = {retries}
# user_agent = "Manga-Fetcher/0.1.0"

[scheduler]
# Requests in flight across all chapters
max_connections = {connections}
# Chapters per wave, or workers in "worker-pool" mode
wave_size = {wave}
mode = "waves"  # waves, worker-pool
# Page ceiling when a chapter does not advertise its page count
max_pages = {max_pages}
overwrite_existing = false

[library]
root = "{root}"
history_file = "{history}"
uppercase = false
edit_mode = false

[endpoints]
lookup_base = "{lookup}"
image_scheme = "{scheme}"

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            keepalive = http::TCP_KEEPALIVE.as_secs(),
            idle = http::POOL_IDLE_TIMEOUT.as_secs(),
            timeout = http::DEFAULT_TIMEOUT.as_secs(),
            connect = http::CONNECT_TIMEOUT.as_secs(),
            rps = limits::DEFAULT_RATE_LIMIT_RPS,
            retries = limits::DEFAULT_THROTTLE_RETRIES,
            connections = scheduler::DEFAULT_MAX_CONNECTIONS,
            wave = scheduler::DEFAULT_WAVE_SIZE,
            max_pages = files::MAX_PAGE_INDEX,
            root = files::DEFAULT_LIBRARY_ROOT,
            history = files::DEFAULT_HISTORY_FILE,
            lookup = endpoints::DEFAULT_LOOKUP_BASE,
            scheme = endpoints::DEFAULT_IMAGE_SCHEME,
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            throttle_retries: self.throttle_retries,
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| http::USER_AGENT.to_string()),
        }
    }
}

impl SchedulerConfigToml {
    /// Convert to runtime SchedulerConfig
    pub fn to_runtime_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_connections: self.max_connections,
            wave_size: self.wave_size,
            mode: self.mode,
            max_pages: self.max_pages,
            overwrite_existing: self.overwrite_existing,
        }
    }
}

impl EndpointsConfigToml {
    /// Convert to runtime Endpoints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the lookup base is not a URL
    pub fn to_runtime_config(&self) -> ConfigResult<Endpoints> {
        Endpoints::new(self.lookup_base.clone(), self.image_scheme.clone()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "endpoints.lookup_base".to_string(),
                value: self.lookup_base.clone(),
                reason: e.to_string(),
            }
        })
    }
}
