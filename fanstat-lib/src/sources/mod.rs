//! Capabilities used to reach the outside world
//!
//! Resolution strategies never talk to the network directly. They go through the
//! capabilities bundled in [`Capabilities`]:
//!
//! - [`PageFetcher`]: fetch a page as HTML. [`HttpFetcher`] does a plain GET,
//!   [`BrowserlessFetcher`] asks a Browserless instance for the rendered DOM so
//!   client-side counters have a chance to animate into place.
//! - [`WebSearch`]: first result URL for a query ([`EngineSearch`]).
//! - [`TextGenerator`]: a language model used as the last-resort estimate ([`GeminiClient`]).
//! - [`SpotifyClient`] and [`InstagramClient`]: the official (or semi-official) APIs.
//!
//! Every capability reports failures as [`SourceError`]. Only the rendered-page
//! fetcher ever raises [`SourceError::SessionFatal`].

mod browserless;
mod error;
mod gemini;
mod http_fetcher;
mod instagram;
mod search;
mod spotify;

pub use browserless::BrowserlessFetcher;
pub use error::SourceError;
pub use gemini::GeminiClient;
pub use http_fetcher::HttpFetcher;
pub use instagram::InstagramClient;
pub use search::{EngineSearch, SearchEngine};
pub use spotify::{SpotifyArtist, SpotifyClient};

use async_trait::async_trait;
use core::fmt::Debug;
use std::sync::Arc;

/// User agent presented to sites that refuse obvious bots.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetch a page and return its HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync + Debug {
    async fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

/// Find the first result URL for a free-text query.
#[async_trait]
pub trait WebSearch: Send + Sync + Debug {
    async fn first_result(&self, query: &str) -> Result<Option<String>, SourceError>;
}

/// Answer a prompt with free text.
#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    async fn generate(&self, prompt: &str) -> crate::Result<String>;
}

/// The set of external capabilities available to a resolution run.
///
/// Optional members are absent when their credentials are not configured; the
/// strategies that need them are then left out of every chain.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Plain HTTP page fetches
    pub http: Arc<dyn PageFetcher>,

    /// Rendered page fetches through a headless browser
    pub browser: Arc<dyn PageFetcher>,

    pub search: Arc<dyn WebSearch>,
    pub instagram: Option<Arc<InstagramClient>>,
    pub spotify: Option<Arc<SpotifyClient>>,
    pub generator: Option<Arc<dyn TextGenerator>>,
}
