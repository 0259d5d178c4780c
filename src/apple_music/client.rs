//! Apple Music HTTP client
//!
//! Handles communication with the Apple Music API.
//! See: https://developer.apple.com/documentation/applemusicapi
//!
//! Every request carries the developer token as a bearer token. Library calls
//! also carry the `Music-User-Token` header.

use std::collections::HashSet;
use std::sync::Mutex;

use reqwest::{Method, StatusCode};

use super::{CatalogError, DEFAULT_STOREFRONT, DeveloperToken, adapter, dto};
use crate::model::{AddStatus, CatalogSong};
use crate::retry::RetryPolicy;

/// Header carrying the user's music token
const USER_TOKEN_HEADER: &str = "Music-User-Token";

/// User agent string
const USER_AGENT: &str = concat!("reelsync/", env!("CARGO_PKG_VERSION"));

/// Default number of search results requested
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Apple Music API client
pub struct AppleMusicClient {
    http_client: reqwest::Client,
    base_url: String,
    developer_token: DeveloperToken,
    user_token: Option<String>,
    storefront: String,
    search_limit: u32,
    retry: RetryPolicy,
    /// IDs added (or found present) during this run
    added: Mutex<HashSet<String>>,
}

impl AppleMusicClient {
    /// Create a new client
    pub fn new(developer_token: DeveloperToken, user_token: Option<String>) -> Self {
        Self::with_base_url("https://api.music.apple.com", developer_token, user_token)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        developer_token: DeveloperToken,
        user_token: Option<String>,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        let user_token = user_token.filter(|t| !t.trim().is_empty());
        if user_token.is_none() {
            tracing::warn!("No Music-User-Token configured; library changes are disabled");
        }

        Self {
            http_client,
            base_url: base_url.into(),
            developer_token,
            user_token,
            storefront: DEFAULT_STOREFRONT.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            retry: RetryPolicy::default(),
            added: Mutex::new(HashSet::new()),
        }
    }

    /// Storefront (country code) for catalog lookups
    pub fn with_storefront(mut self, storefront: impl Into<String>) -> Self {
        self.storefront = storefront.into().to_lowercase();
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.clamp(1, 25);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Whether library changes are possible
    pub fn has_user_token(&self) -> bool {
        self.user_token.is_some()
    }

    /// Search the catalog for songs matching a title and optional artist
    pub async fn search(
        &self,
        title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<CatalogSong>, CatalogError> {
        let term = search_term(title, artist);
        let url = format!(
            "{}/v1/catalog/{}/search?term={}&types=songs&limit={}",
            self.base_url,
            self.storefront,
            urlencoding::encode(&term),
            self.search_limit
        );

        let response = self.request_with_retry(Method::GET, &url, false).await?;
        let body = response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let songs = adapter::to_catalog_songs(body);
        tracing::debug!(term = %term, results = songs.len(), "Catalog search");
        Ok(songs)
    }

    /// Add a song to the user's library.
    ///
    /// Returns [`AddStatus::AlreadyPresent`] for songs added earlier in this run
    /// and for songs the library already holds.
    pub async fn add_to_library(&self, catalog_id: &str) -> Result<AddStatus, CatalogError> {
        if self.user_token.is_none() {
            return Err(CatalogError::NoUserToken);
        }

        if self.was_added(catalog_id) {
            return Ok(AddStatus::AlreadyPresent);
        }

        match self.is_in_library(catalog_id).await {
            Ok(true) => {
                self.mark_added(catalog_id);
                return Ok(AddStatus::AlreadyPresent);
            }
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::debug!("Library check for {} failed: {}", catalog_id, e),
        }

        let url = format!(
            "{}/v1/me/library?ids[songs]={}",
            self.base_url,
            urlencoding::encode(catalog_id)
        );
        let response = self.request_with_retry(Method::POST, &url, true).await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                self.mark_added(catalog_id);
                Ok(AddStatus::AddedOk)
            }
            status => Err(CatalogError::Api(format!(
                "unexpected status {} when adding {}",
                status, catalog_id
            ))),
        }
    }

    /// Look up a catalog song together with its library relationship
    async fn is_in_library(&self, catalog_id: &str) -> Result<bool, CatalogError> {
        let url = format!(
            "{}/v1/catalog/{}/songs/{}?relate=library",
            self.base_url,
            self.storefront,
            urlencoding::encode(catalog_id)
        );
        let response = self.request_with_retry(Method::GET, &url, true).await?;
        let body = response
            .json::<dto::SongsResponse>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(adapter::is_in_library(&body))
    }

    fn was_added(&self, catalog_id: &str) -> bool {
        self.added
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(catalog_id)
    }

    fn mark_added(&self, catalog_id: &str) {
        self.added
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(catalog_id.to_string());
    }

    async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        with_user_token: bool,
    ) -> Result<reqwest::Response, CatalogError> {
        self.retry
            .run("Apple Music request", CatalogError::is_transient, || {
                self.send(method.clone(), url, with_user_token)
            })
            .await
    }

    /// Send the HTTP request and map error statuses
    async fn send(
        &self,
        method: Method,
        url: &str,
        with_user_token: bool,
    ) -> Result<reqwest::Response, CatalogError> {
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(self.developer_token.as_str());

        if with_user_token && let Some(ref user_token) = self.user_token {
            request = request.header(USER_TOKEN_HEADER, user_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Transient(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CatalogError::RateLimited);
        }

        if status.is_server_error() {
            return Err(CatalogError::Transient(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        // Try to parse error response
        let message = match response.json::<dto::ErrorResponse>().await {
            Ok(body) => adapter::error_message(&body),
            Err(_) => None,
        }
        .unwrap_or_else(|| format!("HTTP {}", status));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CatalogError::Auth(message));
        }

        Err(CatalogError::Api(message))
    }
}

/// Build the search term: "title artist"
fn search_term(title: &str, artist: Option<&str>) -> String {
    match artist.map(str::trim).filter(|a| !a.is_empty()) {
        Some(artist) => format!("{} {}", title.trim(), artist),
        None => title.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> DeveloperToken {
        DeveloperToken::from_string("test-token").unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = AppleMusicClient::new(token(), Some("user".to_string()));
        assert_eq!(client.base_url, "https://api.music.apple.com");
        assert_eq!(client.storefront, "us");
        assert_eq!(client.search_limit, DEFAULT_SEARCH_LIMIT);
        assert!(client.has_user_token());
    }

    #[test]
    fn test_builder_options() {
        let client = AppleMusicClient::with_base_url("http://localhost:8080", token(), None)
            .with_storefront("GB")
            .with_search_limit(100);
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.storefront, "gb");
        assert_eq!(client.search_limit, 25);
        assert!(!client.has_user_token());
    }

    #[test]
    fn test_search_term() {
        assert_eq!(
            search_term(" Blinding Lights ", Some("The Weeknd")),
            "Blinding Lights The Weeknd"
        );
        assert_eq!(search_term("Love", None), "Love");
        assert_eq!(search_term("Love", Some("  ")), "Love");
    }

    #[tokio::test]
    async fn test_add_without_user_token() {
        let client = AppleMusicClient::with_base_url("http://127.0.0.1:9", token(), None);
        let result = client.add_to_library("123").await;
        assert!(matches!(result, Err(CatalogError::NoUserToken)));
    }

    #[tokio::test]
    async fn test_repeat_add_short_circuits() {
        // No request is made for IDs already added in this run
        let client =
            AppleMusicClient::with_base_url("http://127.0.0.1:9", token(), Some("u".to_string()));
        client.mark_added("123");
        assert_eq!(
            client.add_to_library("123").await.unwrap(),
            AddStatus::AlreadyPresent
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let client = AppleMusicClient::with_base_url("http://127.0.0.1:9", token(), None)
            .with_retry(RetryPolicy::none());
        let result = client.search("Song", None).await;
        assert!(matches!(result, Err(CatalogError::Transient(_))));
    }
}
