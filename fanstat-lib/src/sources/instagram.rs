use super::BROWSER_USER_AGENT;
use ohno::{IntoAppError, app_err};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;

const LOG_TARGET: &str = " instagram";

pub const DEFAULT_BASE_URL: &str = "https://i.instagram.com";

/// App ID the Instagram web client presents; the profile endpoint rejects requests without it.
const WEB_APP_ID: &str = "936619743392459";

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    data: ProfileData,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    user: Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    edge_followed_by: Option<EdgeCount>,
}

#[derive(Debug, Deserialize)]
struct EdgeCount {
    count: u64,
}

/// Client for Instagram's web profile endpoint.
#[derive(Debug, Clone)]
pub struct InstagramClient {
    client: reqwest::Client,
    base_url: String,
}

impl InstagramClient {
    pub fn new(base_url: Option<&str>) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ig-app-id", HeaderValue::from_static(WEB_APP_ID));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
        })
    }

    /// Follower count for `username`, `None` when the profile exists but reports no count.
    pub async fn follower_count(&self, username: &str) -> crate::Result<Option<u64>> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.base_url);
        log::debug!(target: LOG_TARGET, "Fetching profile info for '{username}'");

        let resp = self
            .client
            .get(&url)
            .query(&[("username", username)])
            .send()
            .await
            .into_app_err_with(|| format!("requesting Instagram profile '{username}'"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("Instagram profile request for '{username}' failed with HTTP status {status}"));
        }

        let profile: ProfileResponse = resp
            .json()
            .await
            .into_app_err_with(|| format!("parsing Instagram profile '{username}'"))?;

        Ok(profile.data.user.and_then(|user| user.edge_followed_by).map(|edge| edge.count))
    }
}
