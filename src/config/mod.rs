//! Configuration system (layered: defaults > config file > env > CLI flags).

pub mod locale;

pub use locale::{detect_locale, parse_locale, Locale};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::provider::PlaidEnvironment;

/// Languages the Link widget can be displayed in.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr", "es", "nl"];

/// Country codes accepted by `/link/token/create`.
pub const SUPPORTED_COUNTRIES: &[&str] = &[
    "US", "CA", "GB", "IE", "FR", "ES", "NL", "DE", "IT", "PL", "DK", "NO", "SE", "EE", "LT",
    "LV", "PT", "BE",
];

pub const DEFAULT_LINK_PORT: u16 = 8080;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = ".plaid-cli";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{env} not set. Set it in the environment or as `{key}` in config.toml")]
    MissingCredential {
        key: &'static str,
        env: &'static str,
    },
    #[error("Invalid language code `{0}`. Configure `plaid.language` (or PLAID_LANGUAGE) to one of: {langs}", langs = SUPPORTED_LANGUAGES.join(", "))]
    InvalidLanguage(String),
    #[error("Invalid country code `{0}`. Configure `plaid.countries` (or PLAID_COUNTRIES) to a subset of: {countries}", countries = SUPPORTED_COUNTRIES.join(", "))]
    InvalidCountry(String),
    #[error("Invalid Plaid environment `{0}`. Valid environments are 'sandbox', 'development' or 'production'")]
    InvalidEnvironment(String),
    #[error("Invalid value for `{key}`: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Could not read config file {path}: {message}")]
    File { path: PathBuf, message: String },
}

/// Resolved CLI configuration.
#[derive(Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub client_id: Option<String>,
    pub secret: Option<String>,
    pub environment: PlaidEnvironment,
    pub language: String,
    pub countries: Vec<String>,
    pub link_port: u16,
    /// Deadline for the browser step of `link`. `None` waits indefinitely.
    pub link_timeout: Option<Duration>,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("data_dir", &self.data_dir)
            .field("client_id", &self.client_id)
            .field("secret", &self.secret.as_ref().map(|_| ".."))
            .field("environment", &self.environment)
            .field("language", &self.language)
            .field("countries", &self.countries)
            .field("link_port", &self.link_port)
            .field("link_timeout", &self.link_timeout)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    plaid: PlaidSection,
    link: LinkSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlaidSection {
    client_id: Option<String>,
    secret: Option<String>,
    environment: Option<String>,
    language: Option<String>,
    countries: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinkSection {
    port: Option<u16>,
    timeout_secs: Option<u64>,
}

impl CliConfig {
    /// `~/.plaid-cli`, or `.plaid-cli` when no home directory is known.
    pub fn default_data_dir() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
    }

    /// Load from `.env`, the process environment and `config.toml`
    /// (in the data dir, then the working directory).
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::load_with(data_dir, &[PathBuf::from(CONFIG_FILE_NAME)], |key| {
            std::env::var(key).ok()
        })
    }

    /// Load with an explicit environment lookup.
    ///
    /// `extra_config_paths` are searched after `<data_dir>/config.toml`; the
    /// first file that exists wins.
    pub fn load_with(
        data_dir: Option<PathBuf>,
        extra_config_paths: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let data_dir = data_dir
            .or_else(|| env("CLI_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(Self::default_data_dir);

        let mut candidates = vec![data_dir.join(CONFIG_FILE_NAME)];
        candidates.extend(extra_config_paths.iter().cloned());
        let file = match candidates.iter().find(|path| path.is_file()) {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        let locale = detect_locale(&env);
        let default_country = locale
            .country
            .filter(|c| SUPPORTED_COUNTRIES.contains(&c.as_str()))
            .unwrap_or_else(|| "US".to_string());

        let environment = match env("PLAID_ENVIRONMENT").or(file.plaid.environment) {
            Some(raw) => raw
                .trim()
                .parse::<PlaidEnvironment>()
                .map_err(|_| ConfigError::InvalidEnvironment(raw))?,
            None => PlaidEnvironment::default(),
        };

        let language = env("PLAID_LANGUAGE")
            .or(file.plaid.language)
            .unwrap_or(locale.language);
        let language = validate_language(&language)?;

        let countries = match env("PLAID_COUNTRIES") {
            Some(raw) => split_list(&raw),
            None => file.plaid.countries.unwrap_or_else(|| vec![default_country]),
        };
        let countries = validate_countries(&countries)?;

        let link_port = match env("LINK_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "link.port",
                value: raw,
            })?,
            None => file.link.port.unwrap_or(DEFAULT_LINK_PORT),
        };

        let timeout_secs = match env("LINK_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    key: "link.timeout_secs",
                    value: raw,
                }
            })?),
            None => file.link.timeout_secs,
        };

        Ok(Self {
            data_dir,
            client_id: env("PLAID_CLIENT_ID").or(file.plaid.client_id),
            secret: env("PLAID_SECRET").or(file.plaid.secret),
            environment,
            language,
            countries,
            link_port,
            link_timeout: timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
        })
    }

    /// Client ID and secret, required by every command that calls Plaid.
    pub fn api_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                key: "plaid.client_id",
                env: "PLAID_CLIENT_ID",
            })?;
        let secret = self
            .secret
            .as_deref()
            .ok_or(ConfigError::MissingCredential {
                key: "plaid.secret",
                env: "PLAID_SECRET",
            })?;
        Ok((client_id, secret))
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::File {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    toml::from_str(&raw).map_err(|err| ConfigError::File {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn validate_language(language: &str) -> Result<String, ConfigError> {
    let normalized = language.trim().to_ascii_lowercase();
    if SUPPORTED_LANGUAGES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ConfigError::InvalidLanguage(language.to_string()))
    }
}

pub fn validate_countries(countries: &[String]) -> Result<Vec<String>, ConfigError> {
    countries
        .iter()
        .map(|country| {
            let upper = country.trim().to_ascii_uppercase();
            if SUPPORTED_COUNTRIES.contains(&upper.as_str()) {
                Ok(upper)
            } else {
                Err(ConfigError::InvalidCountry(country.clone()))
            }
        })
        .collect()
}
