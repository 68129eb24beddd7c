use super::{Strategy, Target};
use crate::metrics::ValidRange;
use crate::resolution::html::{og_description, visible_text};
use crate::resolution::normalize::normalize;
use crate::sources::{PageFetcher, SourceError};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::{Arc, LazyLock};

const LOG_TARGET: &str = "    scrape";

static FOLLOWERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)([\d,.]+[KMB]?)\s*Followers").expect("invalid regex"));
static MONTHLY_LISTENERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,.]+[KMB]?)\s*monthly listeners").expect("invalid regex"));
static FAVORITED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)([\d,.]+)\s*favorited").expect("invalid regex"));
static FAVORITES_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,.]+[KMB]?)\s*(?:Favorites|Favourites)|(?:Favorites|Favourites)\s*:?\s*([\d,.]+[KMB]?)").expect("invalid regex"));
static COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[\d][\d,.]*[KMB]?").expect("invalid regex"));
static BARE_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?[KMB]?$").expect("invalid regex"));

static VERIFIED_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href$="/verified_followers"]"#).expect("invalid selector"));
static INDEX_DATA: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script#index-data").expect("invalid selector"));
static ICON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("svg, path").expect("invalid selector"));

/// Bounds applied to numbers scraped next to a "Followers" label.
const PROFILE_META_RANGE: ValidRange = ValidRange::new(1, 1_999_999_999);
const PROFILE_TEXT_RANGE: ValidRange = ValidRange::new(1_001, 1_999_999_999);
const TWITTER_PROFILE_RANGE: ValidRange = ValidRange::new(1_001, 199_999_999);

/// The verified-followers page is only trusted for very large accounts, where the
/// live counters are known to lag behind.
const TWITTER_VERIFIED_RANGE: ValidRange = ValidRange::new(50_000_001, 199_999_999);

/// How far up from a bare number the favorite icon may sit.
const ICON_SEARCH_DEPTH: usize = 4;

/// Values of every `pattern` match in `text`, in order of appearance.
fn counts<'a>(pattern: &'a Regex, text: &'a str) -> impl Iterator<Item = u64> + 'a {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| normalize(m.as_str()))
}

fn instagram_profile_followers(html: &str) -> Option<u64> {
    let page = Html::parse_document(html);
    og_description(&page)
        .and_then(|description| counts(&FOLLOWERS, &description).find(|v| PROFILE_META_RANGE.contains(*v)))
        .or_else(|| counts(&FOLLOWERS, &visible_text(&page)).find(|v| PROFILE_TEXT_RANGE.contains(*v)))
}

fn twitter_verified_followers(html: &str) -> Option<u64> {
    let page = Html::parse_document(html);
    page.select(&VERIFIED_LINK)
        .map(|link| link.text().collect::<Vec<_>>().join(" "))
        .filter(|text| text.contains("Follower"))
        .filter_map(|text| COUNT.find(&text).map(|m| normalize(m.as_str())))
        .find(|v| TWITTER_VERIFIED_RANGE.contains(*v))
}

fn twitter_profile_followers(html: &str) -> Option<u64> {
    let text = visible_text(&Html::parse_document(html));
    counts(&FOLLOWERS, &text).filter(|v| TWITTER_PROFILE_RANGE.contains(*v)).max()
}

fn snippet_followers(html: &str) -> Option<u64> {
    let text = visible_text(&Html::parse_document(html));
    counts(&FOLLOWERS, &text).find(|v| TWITTER_PROFILE_RANGE.contains(*v))
}

fn listeners_in_meta(page: &Html) -> Option<u64> {
    og_description(page).and_then(|description| counts(&MONTHLY_LISTENERS, &description).find(|v| *v > 0))
}

fn spotify_listeners_from_meta(html: &str) -> Option<u64> {
    listeners_in_meta(&Html::parse_document(html))
}

fn spotify_listeners_from_page(html: &str) -> Option<u64> {
    let page = Html::parse_document(html);
    listeners_in_meta(&page).or_else(|| counts(&MONTHLY_LISTENERS, &visible_text(&page)).find(|v| *v > 0))
}

/// Reads a count from one page of the platform itself.
#[derive(Debug)]
pub struct PageScrape {
    name: &'static str,
    url_template: &'static str,
    fetcher: Arc<dyn PageFetcher>,
    extract: fn(&str) -> Option<u64>,
}

impl PageScrape {
    /// `url_template` contains `{id}`, replaced by the source identifier.
    #[must_use]
    pub fn new(name: &'static str, url_template: &'static str, fetcher: Arc<dyn PageFetcher>, extract: fn(&str) -> Option<u64>) -> Self {
        Self {
            name,
            url_template,
            fetcher,
            extract,
        }
    }

    #[must_use]
    pub fn instagram_profile(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new("profile page", "https://www.instagram.com/{id}/", fetcher, instagram_profile_followers)
    }

    #[must_use]
    pub fn twitter_verified(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(
            "verified followers page",
            "https://x.com/{id}/verified_followers",
            fetcher,
            twitter_verified_followers,
        )
    }

    #[must_use]
    pub fn twitter_profile(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new("profile page", "https://x.com/{id}", fetcher, twitter_profile_followers)
    }

    #[must_use]
    pub fn twitter_search_snippet(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(
            "search snippet",
            "https://www.google.com/search?q=twitter+{id}+followers",
            fetcher,
            snippet_followers,
        )
    }

    #[must_use]
    pub fn spotify_artist(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new("artist page", "https://open.spotify.com/artist/{id}", fetcher, spotify_listeners_from_meta)
    }

    #[must_use]
    pub fn spotify_artist_rendered(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::new(
            "rendered artist page",
            "https://open.spotify.com/artist/{id}",
            fetcher,
            spotify_listeners_from_page,
        )
    }
}

#[async_trait]
impl Strategy for PageScrape {
    fn name(&self) -> &str {
        self.name
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        let url = self.url_template.replace("{id}", target.identifier);
        log::debug!(target: LOG_TARGET, "Scraping {url}");

        let html = self.fetcher.fetch(&url).await?;
        let value = (self.extract)(&html);
        if value.is_none() {
            log::debug!(target: LOG_TARGET, "No count found on {url}");
        }
        Ok(value)
    }
}

/// Favorite count from a StubHub performer page.
///
/// Site-relative identifiers are tried on stubhub.ca first, then stubhub.com;
/// absolute identifiers are used as they are.
#[derive(Debug)]
pub struct StubhubPerformerPage {
    fetcher: Arc<dyn PageFetcher>,
}

const STUBHUB_SITES: &[&str] = &["https://www.stubhub.ca", "https://www.stubhub.com"];

impl StubhubPerformerPage {
    #[must_use]
    pub const fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    fn urls(identifier: &str) -> Vec<String> {
        if identifier.starts_with("http") {
            return vec![identifier.to_string()];
        }

        let path = if identifier.starts_with('/') {
            identifier.to_string()
        } else {
            format!("/{identifier}")
        };
        STUBHUB_SITES.iter().map(|site| format!("{site}{path}")).collect()
    }
}

fn favorites_from_index_data(page: &Html) -> Option<u64> {
    let script = page.select(&INDEX_DATA).next()?.text().collect::<String>();
    let data: serde_json::Value = serde_json::from_str(script.trim()).ok()?;
    ["performer", "performerSummary"]
        .iter()
        .filter_map(|key| data.get(key)?.get("favorites")?.as_u64())
        .find(|v| *v > 0)
}

/// A bare count rendered within a few levels of the heart icon.
fn favorites_next_to_icon(page: &Html) -> Option<u64> {
    page.root_element().descendants().find_map(|node| {
        let text = node.value().as_text()?.trim();
        if !BARE_COUNT.is_match(text) {
            return None;
        }

        let near_icon = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(ICON_SEARCH_DEPTH)
            .any(|element| element.select(&ICON).next().is_some());

        Some(normalize(text)).filter(|v| near_icon && *v > 0)
    })
}

fn stubhub_favorites(html: &str) -> Option<u64> {
    let page = Html::parse_document(html);
    favorites_from_index_data(&page)
        .or_else(|| favorites_next_to_icon(&page))
        .or_else(|| {
            let text = visible_text(&page);
            counts(&FAVORITES_LABEL, &text)
                .find(|v| *v > 0)
                .or_else(|| counts(&FAVORITED, &text).find(|v| *v > 0))
        })
}

#[async_trait]
impl Strategy for StubhubPerformerPage {
    fn name(&self) -> &str {
        "performer page"
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        let mut last_error = None;

        for url in Self::urls(target.identifier) {
            log::debug!(target: LOG_TARGET, "Scraping {url}");

            match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    if let Some(value) = stubhub_favorites(&html) {
                        return Ok(Some(value));
                    }
                    log::debug!(target: LOG_TARGET, "No favorites count on {url}");
                }
                Err(fatal @ SourceError::SessionFatal(_)) => return Err(fatal),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Could not fetch {url}: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        last_error.map_or(Ok(None), Err)
    }
}
