use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::duration::deserialize_duration;
use crate::retry::RetryPolicy;

/// Overrides the credentials file location.
pub const CREDENTIALS_FILE_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";
/// Overrides the config file location.
pub const CONFIG_FILE_ENV: &str = "AWS_CONFIG_FILE";

fn default_credentials_file() -> PathBuf {
    PathBuf::from("~/.aws/credentials")
}

fn default_config_file() -> PathBuf {
    PathBuf::from("~/.aws/config")
}

/// AWS service endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Override for the STS endpoint URL.
    pub sts: Option<String>,

    /// Override for the IAM endpoint URL.
    pub iam: Option<String>,

    /// Region the clients resolve endpoints for and sign requests in. The
    /// global STS and IAM endpoints live in `us-east-1`.
    pub region: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            sts: None,
            iam: None,
            region: "us-east-1".to_string(),
        }
    }
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    #[serde(
        default = "default_http_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
        }
    }
}

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared credentials file. Defaults to `~/.aws/credentials`.
    pub credentials_file: Option<PathBuf>,

    /// Shared config file. Defaults to `~/.aws/config`.
    pub config_file: Option<PathBuf>,

    pub endpoints: EndpointsConfig,

    /// Retry budget for deactivating the old key during rotation.
    pub rotation: RetryPolicy,

    pub http: HttpConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Configuration with file locations settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub credentials_file: PathBuf,
    pub config_file: PathBuf,
    pub endpoints: EndpointsConfig,
    pub rotation: RetryPolicy,
    pub http: HttpConfig,
}

/// Returns the default config file path: `$XDG_CONFIG_HOME/awsudo/config.toml`.
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("awsudo").join("config.toml"),
        None => PathBuf::from("awsudo.toml"),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

impl ResolvedConfig {
    /// Load the config file and apply environment overrides.
    ///
    /// An explicit `path` must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(&default_config_path())?,
        };
        Ok(Self::resolve(config, |name| std::env::var_os(name)))
    }

    /// Settle file locations: environment first, then the config file, then
    /// the AWS defaults.
    pub fn resolve(config: Config, env: impl Fn(&str) -> Option<OsString>) -> Self {
        let pick = |var: &str, configured: Option<PathBuf>, fallback: PathBuf| {
            let path = env(var)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .or(configured)
                .unwrap_or(fallback);
            expand_tilde(&path)
        };

        Self {
            credentials_file: pick(
                CREDENTIALS_FILE_ENV,
                config.credentials_file,
                default_credentials_file(),
            ),
            config_file: pick(CONFIG_FILE_ENV, config.config_file, default_config_file()),
            endpoints: config.endpoints,
            rotation: config.rotation,
            http: config.http,
        }
    }
}
