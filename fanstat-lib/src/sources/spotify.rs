//! Spotify Web API client
//!
//! Authenticates with the client-credentials flow and exposes the two calls
//! resolution needs: artist search and artist lookup.

use ohno::{IntoAppError, app_err};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;

const LOG_TARGET: &str = "   spotify";

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// The subset of the artist object fanstat reads.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub followers: Option<Followers>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Followers {
    pub total: Option<u64>,
}

impl SpotifyArtist {
    #[must_use]
    pub fn follower_total(&self) -> Option<u64> {
        self.followers.as_ref().and_then(|f| f.total)
    }

    /// The first non-blank genre Spotify lists for the artist.
    #[must_use]
    pub fn primary_genre(&self) -> Option<&str> {
        self.genres.iter().map(|genre| genre.trim()).find(|genre| !genre.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    artists: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SpotifyArtist>,
}

#[derive(Debug)]
pub struct SpotifyClient {
    client: reqwest::Client,
    api_url: String,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<String>>,
    artists: Mutex<HashMap<String, SpotifyArtist>>,
}

impl SpotifyClient {
    pub fn new(client_id: &str, client_secret: &str) -> crate::Result<Self> {
        Self::with_urls(client_id, client_secret, DEFAULT_API_URL, DEFAULT_ACCOUNTS_URL)
    }

    pub fn with_urls(client_id: &str, client_secret: &str, api_url: &str, accounts_url: &str) -> crate::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().user_agent("fanstat").build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
            artists: Mutex::new(HashMap::new()),
        })
    }

    /// Access token for API calls, requested once and reused afterwards.
    async fn token(&self) -> crate::Result<String> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(token.clone());
        }

        log::debug!(target: LOG_TARGET, "Requesting client-credentials token");
        let resp = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .into_app_err("requesting Spotify access token")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("Spotify token request failed with HTTP status {status}"));
        }

        let body: TokenResponse = resp.json().await.into_app_err("parsing Spotify token response")?;
        *token = Some(body.access_token.clone());
        Ok(body.access_token)
    }

    /// ID of the best-matching artist for `name`, if any.
    pub async fn search_artist_id(&self, name: &str) -> crate::Result<Option<String>> {
        let token = self.token().await?;
        let resp = self
            .client
            .get(format!("{}/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", format!("artist:{name}").as_str()), ("type", "artist"), ("limit", "1")])
            .send()
            .await
            .into_app_err_with(|| format!("searching Spotify for '{name}'"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("Spotify search for '{name}' failed with HTTP status {status}"));
        }

        let page: SearchResponse = resp.json().await.into_app_err("parsing Spotify search response")?;
        Ok(page.artists.items.into_iter().next().map(|artist| artist.id))
    }

    /// The artist document for `id`, `None` when Spotify does not know the ID.
    ///
    /// Documents are memoized so the families reading different fields of the same
    /// artist share one request.
    pub async fn artist(&self, id: &str) -> crate::Result<Option<SpotifyArtist>> {
        if let Some(artist) = self.artists.lock().await.get(id) {
            return Ok(Some(artist.clone()));
        }

        let token = self.token().await?;
        let resp = self
            .client
            .get(format!("{}/artists/{id}", self.api_url))
            .bearer_auth(token)
            .send()
            .await
            .into_app_err_with(|| format!("fetching Spotify artist '{id}'"))?;

        let status = resp.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            log::debug!(target: LOG_TARGET, "Spotify has no artist '{id}' ({status})");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(app_err!("Spotify artist request for '{id}' failed with HTTP status {status}"));
        }

        let artist: SpotifyArtist = resp.json().await.into_app_err("parsing Spotify artist response")?;
        let _ = self.artists.lock().await.insert(id.to_string(), artist.clone());
        Ok(Some(artist))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> SpotifyClient {
        SpotifyClient::with_urls("id", "secret", &server.uri(), &server.uri()).unwrap()
    }

    #[tokio::test]
    async fn search_returns_first_artist_id() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "artist:Echo"))
            .and(query_param("type", "artist"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "artists": { "items": [ { "id": "3abc", "name": "Echo", "popularity": 71 } ] }
            })))
            .mount(&server)
            .await;

        let id = client(&server).search_artist_id("Echo").await.unwrap();
        assert_eq!(id.as_deref(), Some("3abc"));
    }

    #[tokio::test]
    async fn artist_is_memoized_and_token_reused() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/artists/3abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "3abc",
                "name": "Echo",
                "popularity": 71,
                "followers": { "href": null, "total": 1_204_000 },
                "genres": ["indie pop"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spotify = client(&server);
        let first = spotify.artist("3abc").await.unwrap().unwrap();
        let second = spotify.artist("3abc").await.unwrap().unwrap();

        assert_eq!(first.follower_total(), Some(1_204_000));
        assert_eq!(second.popularity, Some(71));
        assert_eq!(second.primary_genre(), Some("indie pop"));
    }

    #[tokio::test]
    async fn unknown_artist_is_none() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/artists/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client(&server).artist("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).search_artist_id("Echo").await.unwrap_err();
        assert!(format!("{err:#}").contains("401"));
    }
}
