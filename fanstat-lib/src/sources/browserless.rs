use super::{PageFetcher, SourceError};
use async_trait::async_trait;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::Serialize;

const LOG_TARGET: &str = "   browser";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    wait_for_timeout: u64,
}

/// Fetches rendered pages through a Browserless `/content` endpoint.
///
/// The page is loaded in a real browser and left to settle for `page_settle_delay`
/// before its DOM is serialized, which gives client-side counters time to render.
/// A connection failure or a request timeout means the browser service itself is
/// gone or wedged, and is reported as [`SourceError::SessionFatal`].
#[derive(Debug, Clone)]
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    page_settle_delay: Duration,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>, page_settle_delay: Duration, timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout + page_settle_delay).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            page_settle_delay,
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        log::debug!(target: LOG_TARGET, "Rendering {url}");

        let mut request = self.client.post(format!("{}/content", self.base_url)).json(&ContentRequest {
            url,
            wait_for_timeout: u64::try_from(self.page_settle_delay.as_millis()).unwrap_or(u64::MAX),
        });
        if let Some(token) = &self.token {
            request = request.query(&[("token", token)]);
        }

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Err(SourceError::SessionFatal(
                    app_err!("browser service at '{}' did not respond: {e}", self.base_url),
                ));
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("rendering '{url}'")).map_err(SourceError::from),
        };

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(app_err!("browser service returned {status} for '{url}': {}", message.trim()).into());
        }

        match resp.text().await {
            Ok(html) => Ok(html),
            Err(e) if e.is_timeout() => Err(SourceError::SessionFatal(app_err!("browser service timed out rendering '{url}': {e}"))),
            Err(e) => Err(e).into_app_err_with(|| format!("reading rendered '{url}'")).map_err(SourceError::from),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_url_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "secret"))
            .and(body_json(serde_json::json!({ "url": "https://livecounts.nl/x", "waitForTimeout": 1500 })))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div class=\"odometer\">42</div>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = BrowserlessFetcher::new(&server.uri(), Some("secret"), Duration::from_millis(1500), Duration::from_secs(5)).unwrap();
        let html = fetcher.fetch("https://livecounts.nl/x").await.unwrap();
        assert!(html.contains("odometer"));
    }

    #[tokio::test]
    async fn error_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("navigation failed"))
            .mount(&server)
            .await;

        let fetcher = BrowserlessFetcher::new(&server.uri(), None, Duration::ZERO, Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(!err.is_session_fatal());
        assert!(err.to_string().contains("navigation failed"));
    }

    #[tokio::test]
    async fn hung_session_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher = BrowserlessFetcher::new(&server.uri(), None, Duration::ZERO, Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(err.is_session_fatal());
    }

    #[tokio::test]
    async fn unreachable_service_is_fatal() {
        // nothing listens on the discard port
        let fetcher = BrowserlessFetcher::new("http://127.0.0.1:9", None, Duration::ZERO, Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("https://example.com").await.unwrap_err();
        assert!(err.is_session_fatal());
    }
}
