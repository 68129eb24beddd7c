use crate::Result;
use crate::metrics::{MetricFamily, ValidRange};
use crate::resolution::{ResolverSettings, SamplerSettings};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;

const LOG_TARGET: &str = "    config";

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the data directory
pub const CONFIG_FILE_NAME: &str = "fanstat.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Fixed delay before each rendered page navigation
    #[serde(default = "default_page_settle_delay", with = "humantime_serde")]
    pub page_settle_delay: Duration,

    /// Timeout of a rendered page request, on top of the settle delay
    #[serde(default = "default_browser_timeout", with = "humantime_serde")]
    pub browser_timeout: Duration,

    /// Timeout of a plain HTTP request
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Base URL of the Browserless instance
    #[serde(default = "default_browserless_url")]
    pub browserless_url: String,

    /// Gemini model used for estimates
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default)]
    pub sampler: SamplerSettings,

    /// Per-family valid ranges; families not listed use their built-in range
    #[serde(default)]
    pub ranges: BTreeMap<MetricFamily, ValidRange>,

    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Base URLs of the APIs fanstat calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Endpoints {
    #[serde(default = "default_instagram_url")]
    pub instagram: String,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api: String,

    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts: String,

    #[serde(default = "default_gemini_url")]
    pub gemini: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            instagram: default_instagram_url(),
            spotify_api: default_spotify_api_url(),
            spotify_accounts: default_spotify_accounts_url(),
            gemini: default_gemini_url(),
        }
    }
}

const fn default_page_settle_delay() -> Duration {
    Duration::from_secs(5)
}

const fn default_browser_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_browserless_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_instagram_url() -> String {
    "https://i.instagram.com".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `fanstat.toml` in `data_dir` is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(data_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading fanstat configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = data_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!(target: LOG_TARGET, "No configuration file at '{path}', using defaults");
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading fanstat configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        if let Some(parent) = output_path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
        }

        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// The resolver-facing part of the configuration.
    #[must_use]
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            sampler: self.sampler,
            ranges: self.ranges.clone(),
        }
    }

    /// Validate configuration values
    ///
    /// Range bounds are checked while parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range
    fn validate(&self) -> Result<()> {
        if self.sampler.max_attempts == 0 {
            return Err(app_err!("sampler.max_attempts must be at least 1"));
        }

        let tolerance = self.sampler.tolerance_fraction;
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(app_err!("sampler.tolerance_fraction must be between 0 and 1 (exclusive), got {tolerance}"));
        }

        if self.browserless_url.trim().is_empty() {
            return Err(app_err!("browserless_url must not be empty"));
        }

        if self.gemini_model.trim().is_empty() {
            return Err(app_err!("gemini_model must not be empty"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
