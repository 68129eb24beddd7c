//! Plumbing shared by the commands: arguments, logging, and wiring the store,
//! ledger and capabilities together.

use super::config::Config;
use crate::Result;
use crate::ledger::FailureLedger;
use crate::metrics::MetricFamily;
use crate::resolution::{MetricResolver, Refresher, ResolutionOutcome};
use crate::sources::{
    BrowserlessFetcher, Capabilities, EngineSearch, GeminiClient, HttpFetcher, InstagramClient, PageFetcher, SearchEngine, SpotifyClient,
    TextGenerator,
};
use crate::store::{EntityStore, JsonEntityStore};
use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use directories::BaseDirs;
use ohno::IntoAppError;
use owo_colors::OwoColorize;
use std::sync::Arc;

const LOG_TARGET: &str = "    common";

/// Name of the entity store file in the data directory
pub const STORE_FILE_NAME: &str = "entities.json";

/// Name of the failure ledger in the data directory
pub const LEDGER_FILE_NAME: &str = "failed_resolutions.csv";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    fn enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stdout};
                stdout().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments shared by every command that touches the data directory
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the entity store, the failure ledger and `fanstat.toml`
    #[arg(long, value_name = "PATH", env = "FANSTAT_DATA_DIR")]
    pub data_dir: Option<Utf8PathBuf>,

    /// Failure ledger file (default is `failed_resolutions.csv` in the data directory)
    #[arg(long, value_name = "PATH")]
    pub ledger: Option<Utf8PathBuf>,

    /// Path to configuration file (default is `fanstat.toml` in the data directory)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

/// Credentials for the optional capabilities
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Spotify Web API client ID
    #[arg(long, value_name = "ID", env = "SPOTIFY_CLIENT_ID", help_heading = "Credentials")]
    pub spotify_client_id: Option<String>,

    /// Spotify Web API client secret
    #[arg(long, value_name = "SECRET", env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true, help_heading = "Credentials")]
    pub spotify_client_secret: Option<String>,

    /// Gemini API key, enables estimates as a last resort
    #[arg(long, value_name = "KEY", env = "GEMINI_API_KEY", hide_env_values = true, help_heading = "Credentials")]
    pub gemini_api_key: Option<String>,

    /// Browserless API token
    #[arg(long, value_name = "TOKEN", env = "BROWSERLESS_TOKEN", hide_env_values = true, help_heading = "Credentials")]
    pub browserless_token: Option<String>,
}

/// The platform data directory for fanstat.
pub fn default_data_dir() -> Result<Utf8PathBuf> {
    let dir = BaseDirs::new().into_app_err("could not determine data directory")?.data_dir().join("fanstat");
    Utf8PathBuf::from_path_buf(dir).map_err(|dir| ohno::app_err!("data directory '{}' is not valid UTF-8", dir.display()))
}

/// State every data-directory command starts from.
#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub store: Arc<JsonEntityStore>,
    pub ledger: FailureLedger,
    color: ColorMode,
}

impl Common {
    /// Set up logging, load the configuration and locate the store and ledger
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or the config cannot be loaded
    pub fn new(args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);

        let data_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };

        let config = Config::load(&data_dir, args.config.as_ref())?;
        let ledger_path = args.ledger.clone().unwrap_or_else(|| data_dir.join(LEDGER_FILE_NAME));

        Ok(Self {
            config,
            store: Arc::new(JsonEntityStore::new(data_dir.join(STORE_FILE_NAME))),
            ledger: FailureLedger::new(ledger_path),
            color: args.color,
        })
    }

    /// Build the capabilities a run needs, leaving out those without credentials
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created
    pub fn capabilities(&self, credentials: &CredentialArgs) -> Result<Capabilities> {
        let config = &self.config;
        let endpoints = &config.endpoints;

        let http: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.http_timeout)?);
        let browser: Arc<dyn PageFetcher> = Arc::new(BrowserlessFetcher::new(
            &config.browserless_url,
            credentials.browserless_token.as_deref(),
            config.page_settle_delay,
            config.browser_timeout,
        )?);

        let spotify = match (&credentials.spotify_client_id, &credentials.spotify_client_secret) {
            (Some(id), Some(secret)) => Some(Arc::new(SpotifyClient::with_urls(
                id,
                secret,
                &endpoints.spotify_api,
                &endpoints.spotify_accounts,
            )?)),
            _ => {
                log::info!(target: LOG_TARGET, "Spotify credentials not configured, skipping the Spotify API");
                None
            }
        };

        let generator = match &credentials.gemini_api_key {
            Some(key) => {
                Some(Arc::new(GeminiClient::new(key, &config.gemini_model, Some(&endpoints.gemini))?) as Arc<dyn TextGenerator>)
            }
            None => None,
        };

        Ok(Capabilities {
            search: Arc::new(EngineSearch::new(Arc::clone(&http), SearchEngine::defaults())),
            instagram: Some(Arc::new(InstagramClient::new(Some(&endpoints.instagram))?)),
            http,
            browser,
            spotify,
            generator,
        })
    }

    /// A refresher over the store with chains built from `caps`.
    #[must_use]
    pub fn refresher(&self, caps: &Capabilities) -> Refresher {
        let resolver = MetricResolver::new(caps, &self.config.resolver_settings());
        Refresher::new(resolver, Arc::clone(&self.store) as Arc<dyn EntityStore>)
    }

    #[must_use]
    pub fn use_colors(&self) -> bool {
        self.color.enabled()
    }

    /// One line describing a family's outcome.
    #[must_use]
    pub fn outcome_line(&self, family: MetricFamily, outcome: &ResolutionOutcome) -> String {
        let (status, detail) = match outcome {
            ResolutionOutcome::Resolved(value) => ("ok", value.to_string()),
            ResolutionOutcome::NotFound => ("not found", String::new()),
            ResolutionOutcome::Failed(reason) => ("failed", reason.clone()),
        };

        let status = format!("{status:<9}");
        let status = if self.use_colors() {
            match outcome {
                ResolutionOutcome::Resolved(_) => status.green().to_string(),
                ResolutionOutcome::NotFound => status.yellow().to_string(),
                ResolutionOutcome::Failed(_) => status.red().to_string(),
            }
        } else {
            status
        };

        format!("  {:<20} {status} {detail}", family.key()).trim_end().to_string()
    }
}

/// Initialize logger based on log level
fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a second command in the same process keeps the first logger
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
