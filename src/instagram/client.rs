//! Instagram HTTP client
//!
//! Talks to the web endpoints the instagram.com frontend uses. They are not a
//! public API: they require the web app ID header, and most accounts only
//! expose their first page of posts to anonymous callers.
//!
//! ## Authentication
//! A `sessionid` cookie from a logged-in browser session unlocks pagination.
//! If Instagram rejects the session (401/403 or a login redirect), the client
//! logs a warning, forgets the session, and repeats the request anonymously.

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use super::{FetchError, PageCursor, PostPage, adapter, dto};
use crate::retry::RetryPolicy;

/// App ID the instagram.com web frontend sends with API calls
const WEB_APP_ID: &str = "936619743392459";

/// Browser-like user agent; the endpoints reject unknown clients
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/124.0 Safari/537.36 reelsync/",
    env!("CARGO_PKG_VERSION")
);

/// Instagram web API client
pub struct InstagramClient {
    http_client: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
    /// Cleared after the session is rejected
    use_session: AtomicBool,
    page_size: u32,
    retry: RetryPolicy,
}

impl InstagramClient {
    /// Create a new client. Without a session ID the client is anonymous.
    pub fn new(session_id: Option<String>, page_size: u32, retry: RetryPolicy) -> Self {
        Self::with_base_url("https://i.instagram.com", session_id, page_size, retry)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        session_id: Option<String>,
        page_size: u32,
        retry: RetryPolicy,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("x-ig-app-id", HeaderValue::from_static(WEB_APP_ID));

        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        let session_id = session_id.filter(|s| !s.trim().is_empty());
        Self {
            http_client,
            base_url: base_url.into(),
            use_session: AtomicBool::new(session_id.is_some()),
            session_id,
            page_size: page_size.max(1),
            retry,
        }
    }

    /// Whether requests currently carry the session cookie
    pub fn is_authenticated(&self) -> bool {
        self.use_session.load(Ordering::Relaxed)
    }

    /// Fetch one page of posts. `None` fetches the first page.
    pub async fn fetch_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<PostPage, FetchError> {
        match cursor {
            None => self.fetch_profile_page(account).await,
            Some(cursor) => self.fetch_feed_page(account, cursor).await,
        }
    }

    async fn fetch_profile_page(&self, account: &str) -> Result<PostPage, FetchError> {
        let url = format!(
            "{}/api/v1/users/web_profile_info/?username={}",
            self.base_url,
            urlencoding::encode(account)
        );
        let response: dto::ProfileResponse = self.get_json(&url, account).await?;

        let user = response
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| FetchError::NotFound(account.to_string()))?;

        if user.is_private && !self.is_authenticated() {
            return Err(FetchError::Auth(format!(
                "@{} is private; a session of an approved follower is required",
                user.username
            )));
        }

        if let Some(total) = user.edge_owner_to_timeline_media.as_ref().and_then(|m| m.count) {
            tracing::info!("@{} has {} posts", user.username, total);
        }

        Ok(adapter::profile_to_page(user))
    }

    async fn fetch_feed_page(
        &self,
        account: &str,
        cursor: &PageCursor,
    ) -> Result<PostPage, FetchError> {
        let url = format!(
            "{}/api/v1/feed/user/{}/?count={}&max_id={}",
            self.base_url,
            urlencoding::encode(&cursor.user_id),
            self.page_size,
            urlencoding::encode(&cursor.max_id)
        );
        let response: dto::FeedResponse = self.get_json(&url, account).await?;
        Ok(adapter::feed_to_page(&cursor.user_id, response))
    }

    /// GET with retries; falls back to anonymous access if the session is rejected
    async fn get_json<T: DeserializeOwned>(&self, url: &str, account: &str) -> Result<T, FetchError> {
        if self.is_authenticated() {
            match self.get_json_with_retry(url, account, true).await {
                Err(FetchError::Auth(reason)) => {
                    tracing::warn!("Instagram session rejected ({}), continuing anonymously", reason);
                    self.use_session.store(false, Ordering::Relaxed);
                }
                other => return other,
            }
        }
        self.get_json_with_retry(url, account, false).await
    }

    async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        account: &str,
        with_session: bool,
    ) -> Result<T, FetchError> {
        self.retry
            .run("Instagram request", FetchError::is_transient, || {
                self.send(url, account, with_session)
            })
            .await
    }

    /// Send the HTTP request and parse the response
    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        account: &str,
        with_session: bool,
    ) -> Result<T, FetchError> {
        let mut request = self.http_client.get(url);
        if with_session && let Some(ref session_id) = self.session_id {
            request = request.header(COOKIE, format!("sessionid={}", session_id));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(account.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let reason = match response.json::<dto::ApiError>().await {
                Ok(error) => error.message.unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(FetchError::Auth(reason));
        }

        if status.is_server_error() {
            return Err(FetchError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if !status.is_success() {
            if let Ok(error) = response.json::<dto::ApiError>().await {
                if error.require_login {
                    return Err(FetchError::Auth("login required".to_string()));
                }
                return Err(FetchError::Api(format!(
                    "HTTP {}: {}",
                    status,
                    error.message.or(error.status).unwrap_or_default()
                )));
            }
            return Err(FetchError::Api(format!("HTTP {}", status)));
        }

        // Blocked requests are redirected to the HTML login page with a 200
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        if !is_json {
            return Err(FetchError::Auth(
                "login page returned instead of data".to_string(),
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_anonymous() {
        let client = InstagramClient::new(None, 12, RetryPolicy::default());
        assert_eq!(client.base_url, "https://i.instagram.com");
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_blank_session_is_anonymous() {
        let client = InstagramClient::new(Some("  ".to_string()), 12, RetryPolicy::default());
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_client_with_session() {
        let client = InstagramClient::with_base_url(
            "http://localhost:8080",
            Some("abc".to_string()),
            0,
            RetryPolicy::none(),
        );
        assert!(client.is_authenticated());
        assert_eq!(client.page_size, 1);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client =
            InstagramClient::with_base_url("http://127.0.0.1:9", None, 12, RetryPolicy::none());
        let result = client.fetch_page("someone", None).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
