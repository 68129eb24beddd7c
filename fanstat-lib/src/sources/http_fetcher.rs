use super::{BROWSER_USER_AGENT, PageFetcher, SourceError};
use async_trait::async_trait;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

const LOG_TARGET: &str = "      http";

/// Fetches pages with a plain GET request, no script execution.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        log::debug!(target: LOG_TARGET, "GET {url}");

        let resp = self.client.get(url).send().await.into_app_err_with(|| format!("requesting '{url}'"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("unexpected HTTP status {status} from '{url}'").into());
        }

        Ok(resp.text().await.into_app_err_with(|| format!("reading body of '{url}'"))?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/artist/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let body = fetcher.fetch(&format!("{}/artist/abc", server.uri())).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn non_success_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(!err.is_session_fatal());
        assert!(err.to_string().contains("429"));
    }
}
