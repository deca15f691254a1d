use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Teledoc";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when nothing else is configured (local FastAPI dev server).
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Per-request timeout. Diagnosis runs a multi-agent crew server-side,
/// so this is deliberately long.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const ENV_API_URL: &str = "TELEDOC_API_URL";
const ENV_TIMEOUT: &str = "TELEDOC_TIMEOUT_SECS";
const ENV_SESSION_DIR: &str = "TELEDOC_SESSION_DIR";

/// Get the application data directory (~/.teledoc/).
/// Falls back to the working directory when no home is available.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".teledoc")
}

/// Directory holding the persisted session (token + profile).
pub fn session_dir() -> PathBuf {
    app_data_dir().join("session")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "teledoc=info"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API URL '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),
    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Connection settings for the Teledoc backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub session_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            session_dir: session_dir(),
        }
    }
}

impl ClientConfig {
    /// Build a config for an explicit backend URL, other values default.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            ..Self::default()
        })
    }

    /// Read overrides from `TELEDOC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = normalize_base_url(&url)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.timeout_secs = raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidVar {
                    var: ENV_TIMEOUT,
                    value: raw.clone(),
                })?;
        }
        if let Some(dir) = lookup(ENV_SESSION_DIR) {
            config.session_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Join an API path (starting with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}
