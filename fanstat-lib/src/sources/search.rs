use super::{PageFetcher, SourceError, WebSearch};
use async_trait::async_trait;
use ohno::IntoAppError;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use url::Url;

const LOG_TARGET: &str = "    search";

static BING_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.b_algo a[href]").expect("invalid selector"));
static DUCKDUCKGO_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__a[href]").expect("invalid selector"));
static YAHOO_RESULT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.algo a[href], div.algo-sr a[href]").expect("invalid selector"));

/// A search engine whose HTML results page can be scraped for the first link.
#[derive(Debug, Clone)]
pub enum SearchEngine {
    Bing { base_url: String },
    DuckDuckGo { base_url: String },
    Yahoo { base_url: String },
}

impl SearchEngine {
    /// The public engines, in the order they are tried.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Bing {
                base_url: "https://www.bing.com".into(),
            },
            Self::DuckDuckGo {
                base_url: "https://html.duckduckgo.com".into(),
            },
            Self::Yahoo {
                base_url: "https://search.yahoo.com".into(),
            },
        ]
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Bing { .. } => "Bing",
            Self::DuckDuckGo { .. } => "DuckDuckGo",
            Self::Yahoo { .. } => "Yahoo",
        }
    }

    fn query_url(&self, query: &str) -> crate::Result<Url> {
        let (base, path, param) = match self {
            Self::Bing { base_url } => (base_url, "/search", "q"),
            Self::DuckDuckGo { base_url } => (base_url, "/html/", "q"),
            Self::Yahoo { base_url } => (base_url, "/search", "p"),
        };

        Url::parse_with_params(&format!("{}{path}", base.trim_end_matches('/')), &[(param, query)])
            .into_app_err_with(|| format!("building {} search URL", self.name()))
    }

    fn first_link(&self, html: &str) -> Option<String> {
        let selector = match self {
            Self::Bing { .. } => &*BING_RESULT,
            Self::DuckDuckGo { .. } => &*DUCKDUCKGO_RESULT,
            Self::Yahoo { .. } => &*YAHOO_RESULT,
        };

        let page = Html::parse_document(html);
        page.select(selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(|href| unwrap_redirect(href.trim()))
            .find(|link| link.starts_with("http"))
    }
}

/// Resolve the engines' click-tracking links to the destination URL.
fn unwrap_redirect(link: &str) -> String {
    // DuckDuckGo: //duckduckgo.com/l/?uddg=<encoded>&rut=...
    let absolute = if link.starts_with("//") { format!("https:{link}") } else { link.to_string() };
    if let Ok(url) = Url::parse(&absolute)
        && let Some((_, target)) = url.query_pairs().find(|(key, _)| key == "uddg")
    {
        return target.into_owned();
    }

    // Yahoo: https://r.search.yahoo.com/.../RU=<encoded>/RK=2/RS=...
    if let Some(start) = absolute.find("/RU=") {
        let encoded = absolute.get(start + 4..).unwrap_or_default();
        let encoded = encoded.split("/R").next().unwrap_or(encoded);
        if let Some((_, target)) = url::form_urlencoded::parse(format!("u={encoded}").as_bytes()).next() {
            return target.into_owned();
        }
    }

    absolute
}

/// [`WebSearch`] over the HTML result pages of several public engines.
///
/// Engines are tried in order until one yields a result; an engine that errors
/// or returns nothing usable is skipped.
#[derive(Debug, Clone)]
pub struct EngineSearch {
    fetcher: Arc<dyn PageFetcher>,
    engines: Vec<SearchEngine>,
}

impl EngineSearch {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, engines: Vec<SearchEngine>) -> Self {
        Self { fetcher, engines }
    }
}

#[async_trait]
impl WebSearch for EngineSearch {
    async fn first_result(&self, query: &str) -> Result<Option<String>, SourceError> {
        for engine in &self.engines {
            let url = engine.query_url(query)?;

            match self.fetcher.fetch(url.as_str()).await {
                Ok(html) => {
                    if let Some(link) = engine.first_link(&html) {
                        log::debug!(target: LOG_TARGET, "{} result for '{query}': {link}", engine.name());
                        return Ok(Some(link));
                    }
                    log::debug!(target: LOG_TARGET, "{} returned no usable result for '{query}'", engine.name());
                }
                Err(fatal @ SourceError::SessionFatal(_)) => return Err(fatal),
                Err(e) => log::debug!(target: LOG_TARGET, "{} search failed for '{query}': {e:#}", engine.name()),
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::sources::HttpFetcher;
    use core::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn unwraps_duckduckgo_redirect() {
        let link = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.instagram.com%2Fnovaofficial%2F&rut=abc";
        assert_eq!(unwrap_redirect(link), "https://www.instagram.com/novaofficial/");
    }

    #[test]
    fn unwraps_yahoo_redirect() {
        let link = "https://r.search.yahoo.com/_ylt=x;_ylu=y/RV=2/RE=1/RO=10/RU=https%3a%2f%2fx.com%2fnova/RK=2/RS=z";
        assert_eq!(unwrap_redirect(link), "https://x.com/nova");
    }

    #[test]
    fn plain_links_pass_through() {
        assert_eq!(unwrap_redirect("https://open.spotify.com/artist/abc"), "https://open.spotify.com/artist/abc");
    }

    #[test]
    fn bing_first_result() {
        let html = r#"<ol><li class="b_algo" data-id="1"><h2><a href="https://www.instagram.com/novaofficial/" h="ID=1">Nova</a></h2></li>
            <li class="b_algo"><h2><a href="https://example.com/">other</a></h2></li></ol>"#;
        let engine = SearchEngine::Bing { base_url: String::new() };
        assert_eq!(engine.first_link(html).as_deref(), Some("https://www.instagram.com/novaofficial/"));
    }

    #[test]
    fn yahoo_first_result_skips_ads() {
        let html = r#"<div class="searchCenterTopAds"><a href="https://ads.example.com/">ad</a></div>
            <div class="dd algo algo-sr Sr"><div class="compTitle"><h3><a href="https://r.search.yahoo.com/_ylt=x/RU=https%3a%2f%2fwww.stubhub.ca%2fnova-tickets%2fperformer%2f1/RK=2/RS=y">Nova</a></h3></div></div>"#;
        let engine = SearchEngine::Yahoo { base_url: String::new() };
        assert_eq!(engine.first_link(html).as_deref(), Some("https://www.stubhub.ca/nova-tickets/performer/1"));
    }

    #[tokio::test]
    async fn falls_through_to_next_engine() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "instagram Nova official"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.instagram.com%2Fnovaofficial%2F&amp;rut=1">Nova</a>"#,
            ))
            .mount(&server)
            .await;

        let engines = vec![
            SearchEngine::Bing { base_url: server.uri() },
            SearchEngine::DuckDuckGo { base_url: server.uri() },
        ];
        let search = EngineSearch::new(Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap()), engines);

        let link = search.first_result("instagram Nova official").await.unwrap();
        assert_eq!(link.as_deref(), Some("https://www.instagram.com/novaofficial/"));
    }

    #[tokio::test]
    async fn none_when_every_engine_comes_up_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no results</html>"))
            .mount(&server)
            .await;

        let search = EngineSearch::new(
            Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap()),
            vec![SearchEngine::Yahoo { base_url: server.uri() }],
        );
        assert_eq!(search.first_result("stubhub Nova tickets performer").await.unwrap(), None);
    }
}
