use super::{Strategy, Target};
use crate::sources::{InstagramClient, SourceError, SpotifyClient};
use async_trait::async_trait;
use std::sync::Arc;

/// Follower count from Instagram's web profile endpoint.
#[derive(Debug)]
pub struct InstagramApi {
    client: Arc<InstagramClient>,
}

impl InstagramApi {
    #[must_use]
    pub const fn new(client: Arc<InstagramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Strategy for InstagramApi {
    fn name(&self) -> &str {
        "instagram api"
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        Ok(self.client.follower_count(target.identifier).await?)
    }
}

/// Which number of the Spotify artist document to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyField {
    Followers,
    Popularity,
}

/// A field of the Spotify Web API artist document.
#[derive(Debug)]
pub struct SpotifyApi {
    client: Arc<SpotifyClient>,
    field: SpotifyField,
}

impl SpotifyApi {
    #[must_use]
    pub const fn new(client: Arc<SpotifyClient>, field: SpotifyField) -> Self {
        Self { client, field }
    }
}

#[async_trait]
impl Strategy for SpotifyApi {
    fn name(&self) -> &str {
        "spotify api"
    }

    async fn attempt(&self, target: &Target<'_>) -> Result<Option<u64>, SourceError> {
        let Some(artist) = self.client.artist(target.identifier).await? else {
            return Ok(None);
        };

        Ok(match self.field {
            SpotifyField::Followers => artist.follower_total(),
            SpotifyField::Popularity => artist.popularity,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reads_both_spotify_fields_from_one_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access_token": "tok" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artists/3abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "3abc", "name": "Echo", "popularity": 0, "followers": { "total": 88_000 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(SpotifyClient::with_urls("id", "secret", &server.uri(), &server.uri()).unwrap());
        let target = Target {
            entity_name: "Echo",
            identifier: "3abc",
        };

        let followers = SpotifyApi::new(Arc::clone(&client), SpotifyField::Followers);
        let popularity = SpotifyApi::new(client, SpotifyField::Popularity);

        assert_eq!(followers.attempt(&target).await.unwrap(), Some(88_000));
        assert_eq!(popularity.attempt(&target).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn instagram_api_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let strategy = InstagramApi::new(Arc::new(InstagramClient::new(Some(&server.uri())).unwrap()));
        let target = Target {
            entity_name: "Nova",
            identifier: "novaofficial",
        };

        let err = strategy.attempt(&target).await.unwrap_err();
        assert!(!err.is_session_fatal());
    }
}
