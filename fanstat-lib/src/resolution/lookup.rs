use super::outcome::SessionFatal;
use crate::metrics::{MetricFamily, Source};
use crate::sources::{SourceError, SpotifyClient, WebSearch};
use crate::store::Entity;
use regex::Regex;
use std::sync::{Arc, LazyLock};

const LOG_TARGET: &str = "    lookup";

static INSTAGRAM_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[/.])instagram\.com/([^/?#\s]+)").expect("invalid regex"));
static TWITTER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[/.])(?:twitter|x)\.com/([^/?#\s]+)").expect("invalid regex"));
static SPOTIFY_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"artist/([A-Za-z0-9]+)").expect("invalid regex"));
static STUBHUB_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"stubhub\.(?:ca|com)(/[^?#\s]+)").expect("invalid regex"));

/// Path segments that look like profiles but are site features.
const INSTAGRAM_RESERVED: &[&str] = &["p", "reels", "reel", "stories", "explore", "accounts"];
const TWITTER_RESERVED: &[&str] = &["intent", "share", "search", "i", "x", "home", "hashtag"];
const NO_RESERVED: &[&str] = &[];

/// Search query used to discover an identifier for `source`.
#[must_use]
pub fn search_query(source: Source, entity_name: &str) -> String {
    match source {
        Source::Instagram => format!("instagram {entity_name} official"),
        Source::Twitter => format!("twitter {entity_name} official"),
        Source::Spotify => format!("spotify artist {entity_name}"),
        Source::Stubhub => format!("stubhub {entity_name} tickets performer"),
    }
}

/// Extract the identifier for `source` from a result URL, if the URL has the expected shape.
#[must_use]
pub fn identifier_from_url(source: Source, url: &str) -> Option<String> {
    let (pattern, reserved): (&Regex, &[&str]) = match source {
        Source::Instagram => (&*INSTAGRAM_URL, INSTAGRAM_RESERVED),
        Source::Twitter => (&*TWITTER_URL, TWITTER_RESERVED),
        Source::Spotify => (&*SPOTIFY_URL, NO_RESERVED),
        Source::Stubhub => (&*STUBHUB_URL, NO_RESERVED),
    };

    let segment = pattern.captures(url)?.get(1)?.as_str();
    if reserved.iter().any(|r| r.eq_ignore_ascii_case(segment)) {
        log::debug!(target: LOG_TARGET, "Rejecting '{url}': '{segment}' is not a {} profile", source.display_name());
        return None;
    }

    Some(segment.to_string())
}

/// Finds the per-source identifier an entity needs before any metric can be read.
#[derive(Debug, Clone)]
pub struct SourceLookupResolver {
    search: Arc<dyn WebSearch>,
    spotify: Option<Arc<SpotifyClient>>,
}

impl SourceLookupResolver {
    #[must_use]
    pub fn new(search: Arc<dyn WebSearch>, spotify: Option<Arc<SpotifyClient>>) -> Self {
        Self { search, spotify }
    }

    /// The identifier of the source behind `family`: the stored one when present,
    /// otherwise one discovered through the Spotify API (for Spotify) or a web search.
    ///
    /// Lookup failures are not errors; they make the identifier absent.
    pub async fn resolve_identifier(&self, entity: &Entity, family: MetricFamily) -> Result<Option<String>, SessionFatal> {
        let source = family.source();
        if let Some(id) = entity.identifier(source) {
            return Ok(Some(id.to_string()));
        }

        if source == Source::Spotify
            && let Some(spotify) = &self.spotify
        {
            match spotify.search_artist_id(&entity.name).await {
                Ok(Some(id)) => {
                    log::info!(target: LOG_TARGET, "Found Spotify artist '{id}' for '{}' through the API", entity.name);
                    return Ok(Some(id));
                }
                Ok(None) => log::debug!(target: LOG_TARGET, "Spotify API search found nothing for '{}'", entity.name),
                Err(e) => log::debug!(target: LOG_TARGET, "Spotify API search failed for '{}': {e:#}", entity.name),
            }
        }

        let query = search_query(source, &entity.name);
        let url = match self.search.first_result(&query).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                log::debug!(target: LOG_TARGET, "No search result for '{query}'");
                return Ok(None);
            }
            Err(SourceError::SessionFatal(e)) => return Err(SessionFatal(e)),
            Err(SourceError::Transient(e)) => {
                log::debug!(target: LOG_TARGET, "Search for '{query}' failed: {e:#}");
                return Ok(None);
            }
        };

        let id = identifier_from_url(source, &url);
        match &id {
            Some(id) => log::info!(target: LOG_TARGET, "Found {} identifier '{id}' for '{}'", source.display_name(), entity.name),
            None => log::debug!(target: LOG_TARGET, "Result '{url}' for '{query}' does not name a {} profile", source.display_name()),
        }
        Ok(id)
    }
}
