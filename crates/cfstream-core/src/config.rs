//! Configuration module
//!
//! Credentials and connection settings come from an optional TOML file
//! overlaid by environment variables (a `.env` file is honoured through
//! `dotenvy`). Environment values always win over the file.
//!
//! | key            | env var                 | default                                   |
//! |----------------|-------------------------|-------------------------------------------|
//! | `account_id`   | `CFSTREAM_ACCOUNT_ID`   | required                                  |
//! | `api_token`    | `CFSTREAM_API_TOKEN`    | required                                  |
//! | `api_url`      | `CFSTREAM_API_URL`      | `https://api.cloudflare.com/client/v4`    |
//! | `timeout_secs` | `CFSTREAM_TIMEOUT_SECS` | `600`                                     |
//!
//! The file is read from `$CFSTREAM_CONFIG` when set, otherwise from
//! `<config dir>/cfstream/config.toml`. A missing file is not an error.

use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub const ENV_ACCOUNT_ID: &str = "CFSTREAM_ACCOUNT_ID";
pub const ENV_API_TOKEN: &str = "CFSTREAM_API_TOKEN";
pub const ENV_API_URL: &str = "CFSTREAM_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CFSTREAM_TIMEOUT_SECS";
pub const ENV_CONFIG_PATH: &str = "CFSTREAM_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// On-disk shape; every key is optional so env vars can fill the gaps.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    account_id: Option<String>,
    api_token: Option<String>,
    api_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// Resolved client configuration
#[derive(Clone)]
pub struct Config {
    pub account_id: String,
    pub api_token: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load from the default file location and the process environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = env::var(ENV_CONFIG_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(Self::default_path);

        let config = Self::from_sources(path.as_deref(), |key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an optional file and an env lookup function.
    ///
    /// Does not validate; call [`Config::validate`] afterwards.
    pub fn from_sources<F>(file: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_config = match file {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };

        let env_value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match env_value(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))
            })?,
            None => file_config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            account_id: env_value(ENV_ACCOUNT_ID)
                .or(file_config.account_id)
                .unwrap_or_default(),
            api_token: env_value(ENV_API_TOKEN)
                .or(file_config.api_token)
                .unwrap_or_default(),
            api_url: env_value(ENV_API_URL)
                .or(file_config.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout_secs,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "account_id is required (set {} or add it to the config file)",
                ENV_ACCOUNT_ID
            )));
        }
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "api_token is required (set {} or add it to the config file)",
                ENV_API_TOKEN
            )));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL (got: {})",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `<config dir>/cfstream/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cfstream").join("config.toml"))
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_only_uses_defaults() {
        let config = Config::from_sources(
            None,
            lookup_from(&[(ENV_ACCOUNT_ID, "acc"), (ENV_API_TOKEN, "tok")]),
        )
        .unwrap();

        assert_eq!(config.account_id, "acc");
        assert_eq!(config.api_token, "tok");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, 600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "account_id = \"from-file\"\napi_token = \"file-token\"\ntimeout_secs = 30"
        )
        .unwrap();

        let config = Config::from_sources(
            Some(file.path()),
            lookup_from(&[(ENV_ACCOUNT_ID, "from-env")]),
        )
        .unwrap();

        assert_eq!(config.account_id, "from-env");
        assert_eq!(config.api_token, "file-token");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn blank_env_values_fall_through_to_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "account_id = \"from-file\"").unwrap();

        let config =
            Config::from_sources(Some(file.path()), lookup_from(&[(ENV_ACCOUNT_ID, "  ")]))
                .unwrap();
        assert_eq!(config.account_id, "from-file");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = Config::from_sources(Some(path.as_path()), lookup_from(&[])).unwrap();
        assert!(config.account_id.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "account_id = [not toml").unwrap();

        let result = Config::from_sources(Some(file.path()), lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let result = Config::from_sources(None, lookup_from(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_requires_credentials_and_http_url() {
        let base = Config {
            account_id: "acc".into(),
            api_token: "tok".into(),
            api_url: DEFAULT_API_URL.into(),
            timeout_secs: 10,
        };
        assert!(base.validate().is_ok());

        let mut missing_account = base.clone();
        missing_account.account_id = " ".into();
        assert!(missing_account.validate().is_err());

        let mut missing_token = base.clone();
        missing_token.api_token = String::new();
        assert!(missing_token.validate().is_err());

        let mut bad_url = base.clone();
        bad_url.api_url = "ftp://example.com".into();
        assert!(bad_url.validate().is_err());

        let mut zero_timeout = base;
        zero_timeout.timeout_secs = 0;
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config {
            account_id: "acc".into(),
            api_token: "super-secret".into(),
            api_url: DEFAULT_API_URL.into(),
            timeout_secs: 10,
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
