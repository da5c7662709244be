//! Core configuration structures and layered loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default endpoint of the encoding API
pub const DEFAULT_API_BASE_URL: &str = "https://api.bitmovin.com/v1";

/// Default delay between two encoding status requests
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Name of the local configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "examples.toml";

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required value was not provided by any source
    #[error("Missing configuration value {0}; set it as argument, in examples.toml or as environment variable")]
    Missing(&'static str),

    /// Argument was not of the form KEY=value
    #[error("Invalid argument '{0}', expected KEY=value")]
    InvalidArgument(String),

    /// Key is not a known configuration parameter
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Value could not be converted to the type of the key
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Every parameter that can be supplied through arguments or the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiKey,
    TenantOrgId,
    ApiBaseUrl,
    InputHost,
    InputFilePath,
    InputFilePathMonoTracks,
    OutputBucketName,
    OutputAccessKey,
    OutputSecretKey,
    OutputBasePath,
    PollIntervalSecs,
    PollTimeoutSecs,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 12] = [
        ConfigKey::ApiKey,
        ConfigKey::TenantOrgId,
        ConfigKey::ApiBaseUrl,
        ConfigKey::InputHost,
        ConfigKey::InputFilePath,
        ConfigKey::InputFilePathMonoTracks,
        ConfigKey::OutputBucketName,
        ConfigKey::OutputAccessKey,
        ConfigKey::OutputSecretKey,
        ConfigKey::OutputBasePath,
        ConfigKey::PollIntervalSecs,
        ConfigKey::PollTimeoutSecs,
    ];

    /// Name used for environment variables and `KEY=value` arguments
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "BITMOVIN_API_KEY",
            ConfigKey::TenantOrgId => "BITMOVIN_TENANT_ORG_ID",
            ConfigKey::ApiBaseUrl => "BITMOVIN_API_BASE_URL",
            ConfigKey::InputHost => "HTTP_INPUT_HOST",
            ConfigKey::InputFilePath => "HTTP_INPUT_FILE_PATH",
            ConfigKey::InputFilePathMonoTracks => "HTTP_INPUT_FILE_PATH_MULTIPLE_MONO_AUDIO_TRACKS",
            ConfigKey::OutputBucketName => "S3_OUTPUT_BUCKET_NAME",
            ConfigKey::OutputAccessKey => "S3_OUTPUT_ACCESS_KEY",
            ConfigKey::OutputSecretKey => "S3_OUTPUT_SECRET_KEY",
            ConfigKey::OutputBasePath => "S3_OUTPUT_BASE_PATH",
            ConfigKey::PollIntervalSecs => "POLL_INTERVAL_SECS",
            ConfigKey::PollTimeoutSecs => "POLL_TIMEOUT_SECS",
        }
    }

    pub fn from_name(name: &str) -> Option<ConfigKey> {
        Self::ALL.iter().copied().find(|key| key.name() == name)
    }
}

/// Encoding API access
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiConfig {
    pub key: Option<String>,
    /// Organisation to act in when working with a multi-tenant account
    pub tenant_org_id: Option<String>,
    pub base_url: Option<String>,
}

/// HTTP server hosting the input files
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InputConfig {
    pub host: Option<String>,
    pub file_path: Option<String>,
    pub file_path_multiple_mono_audio_tracks: Option<String>,
}

/// S3 bucket receiving the generated content
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    pub bucket_name: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub base_path: Option<String>,
}

/// Status polling behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PollingConfig {
    pub interval_secs: Option<u64>,
    /// Give up waiting after this many seconds (unset = wait forever)
    pub timeout_secs: Option<u64>,
}

/// Main configuration structure
///
/// Every field is optional so that several sources can be layered on top of each
/// other. The typed getters report a [`ConfigError::Missing`] for required values
/// none of the sources provided.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Where [`Config::resolve`] looks for configuration values
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// `KEY=value` command line arguments
    pub args: Vec<String>,
    /// Local config file; skipped when it does not exist
    pub local_file: Option<PathBuf>,
    /// Per-user config file; skipped when it does not exist
    pub user_file: Option<PathBuf>,
}

impl ConfigSources {
    /// Sources with the conventional file locations
    pub fn with_defaults(args: Vec<String>) -> Self {
        Self {
            args,
            local_file: Some(PathBuf::from(LOCAL_CONFIG_FILE)),
            user_file: default_user_file(),
        }
    }
}

/// `~/.bitmovin/examples.toml`, if a home directory is known
pub fn default_user_file() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".bitmovin").join(LOCAL_CONFIG_FILE))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no source may set, such as a zero poll interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: ConfigKey::PollIntervalSecs.name(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Build a configuration layer from `KEY=value` arguments
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Config::default();
        for arg in args {
            let arg = arg.as_ref();
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidArgument(arg.to_string()))?;
            let key = ConfigKey::from_name(name.trim())
                .ok_or_else(|| ConfigError::UnknownKey(name.trim().to_string()))?;
            config.set(key, value.trim())?;
        }
        Ok(config)
    }

    /// Build a configuration layer from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Every [`ConfigKey`] is looked up by its name. Numeric values that fail to
    /// parse are ignored and the existing value is kept.
    pub fn apply_env_overrides(&mut self) {
        for key in ConfigKey::ALL {
            if let Ok(val) = env::var(key.name()) {
                // Invalid value, keep existing
                let _ = self.set(key, &val);
            }
        }
    }

    /// Set a single value
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let text = Some(value.to_string());
        match key {
            ConfigKey::ApiKey => self.api.key = text,
            ConfigKey::TenantOrgId => self.api.tenant_org_id = text,
            ConfigKey::ApiBaseUrl => self.api.base_url = text,
            ConfigKey::InputHost => self.input.host = text,
            ConfigKey::InputFilePath => self.input.file_path = text,
            ConfigKey::InputFilePathMonoTracks => {
                self.input.file_path_multiple_mono_audio_tracks = text
            }
            ConfigKey::OutputBucketName => self.output.bucket_name = text,
            ConfigKey::OutputAccessKey => self.output.access_key = text,
            ConfigKey::OutputSecretKey => self.output.secret_key = text,
            ConfigKey::OutputBasePath => self.output.base_path = text,
            ConfigKey::PollIntervalSecs => {
                self.polling.interval_secs = Some(parse_interval(key, value)?)
            }
            ConfigKey::PollTimeoutSecs => {
                self.polling.timeout_secs = Some(parse_secs(key, value)?)
            }
        }
        Ok(())
    }

    /// Fill every unset value of `self` from `lower`
    pub fn merge(self, lower: Config) -> Config {
        Config {
            api: ApiConfig {
                key: self.api.key.or(lower.api.key),
                tenant_org_id: self.api.tenant_org_id.or(lower.api.tenant_org_id),
                base_url: self.api.base_url.or(lower.api.base_url),
            },
            input: InputConfig {
                host: self.input.host.or(lower.input.host),
                file_path: self.input.file_path.or(lower.input.file_path),
                file_path_multiple_mono_audio_tracks: self
                    .input
                    .file_path_multiple_mono_audio_tracks
                    .or(lower.input.file_path_multiple_mono_audio_tracks),
            },
            output: OutputConfig {
                bucket_name: self.output.bucket_name.or(lower.output.bucket_name),
                access_key: self.output.access_key.or(lower.output.access_key),
                secret_key: self.output.secret_key.or(lower.output.secret_key),
                base_path: self.output.base_path.or(lower.output.base_path),
            },
            polling: PollingConfig {
                interval_secs: self.polling.interval_secs.or(lower.polling.interval_secs),
                timeout_secs: self.polling.timeout_secs.or(lower.polling.timeout_secs),
            },
        }
    }

    /// Combine layers, highest precedence first
    pub fn layered<I: IntoIterator<Item = Config>>(layers: I) -> Config {
        layers
            .into_iter()
            .fold(Config::default(), |acc, layer| acc.merge(layer))
    }

    /// Resolve configuration from all sources
    ///
    /// Precedence, highest first:
    /// 1. command line arguments
    /// 2. the local config file
    /// 3. environment variables
    /// 4. the per-user config file
    pub fn resolve(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let args = Self::from_args(&sources.args)?;
        let local = load_optional(sources.local_file.as_deref())?;
        let env = Self::from_env();
        let user = load_optional(sources.user_file.as_deref())?;
        let config = Self::layered([args, local, env, user]);
        config.validate()?;
        Ok(config)
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        required(&self.api.key, ConfigKey::ApiKey)
    }

    pub fn tenant_org_id(&self) -> Option<&str> {
        self.api.tenant_org_id.as_deref()
    }

    pub fn api_base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn http_input_host(&self) -> Result<&str, ConfigError> {
        required(&self.input.host, ConfigKey::InputHost)
    }

    pub fn http_input_file_path(&self) -> Result<&str, ConfigError> {
        required(&self.input.file_path, ConfigKey::InputFilePath)
    }

    pub fn http_input_file_path_with_multiple_mono_audio_tracks(
        &self,
    ) -> Result<&str, ConfigError> {
        required(
            &self.input.file_path_multiple_mono_audio_tracks,
            ConfigKey::InputFilePathMonoTracks,
        )
    }

    pub fn s3_output_bucket_name(&self) -> Result<&str, ConfigError> {
        required(&self.output.bucket_name, ConfigKey::OutputBucketName)
    }

    pub fn s3_output_access_key(&self) -> Result<&str, ConfigError> {
        required(&self.output.access_key, ConfigKey::OutputAccessKey)
    }

    pub fn s3_output_secret_key(&self) -> Result<&str, ConfigError> {
        required(&self.output.secret_key, ConfigKey::OutputSecretKey)
    }

    pub fn s3_output_base_path(&self) -> Result<&str, ConfigError> {
        required(&self.output.base_path, ConfigKey::OutputBasePath)
    }

    /// Delay between status requests (default 5 seconds)
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.polling
                .interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    /// Upper bound for waiting on an encoding, `None` waits indefinitely
    pub fn poll_timeout(&self) -> Option<Duration> {
        self.polling.timeout_secs.map(Duration::from_secs)
    }
}

fn required<'a>(value: &'a Option<String>, key: ConfigKey) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key.name()))
}

fn parse_secs(key: ConfigKey, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key: key.name(),
        value: value.to_string(),
    })
}

fn parse_interval(key: ConfigKey, value: &str) -> Result<u64, ConfigError> {
    match parse_secs(key, value)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.name(),
            value: value.to_string(),
        }),
        secs => Ok(secs),
    }
}

fn load_optional(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) if path.is_file() => Config::load_from_file(path),
        _ => Ok(Config::default()),
    }
}
