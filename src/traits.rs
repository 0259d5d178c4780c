//! Trait definitions for the external services.
//!
//! The pipeline only talks to Instagram and Apple Music through these traits,
//! so tests can substitute the mocks below for the real clients.

use async_trait::async_trait;

use crate::apple_music::{AppleMusicClient, CatalogError};
use crate::instagram::{FetchError, InstagramClient, PageCursor, PostPage};
use crate::model::{AddStatus, CatalogSong};

/// A paged source of posts.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch one page of `account`'s posts. `None` requests the newest page.
    async fn fetch_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<PostPage, FetchError>;
}

/// A music catalog with a per-user library.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Search the catalog for songs, best catalog matches first.
    async fn search(
        &self,
        title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<CatalogSong>, CatalogError>;

    /// Add a song to the user's library. Adding a song twice is not an error.
    async fn add_to_library(&self, catalog_id: &str) -> Result<AddStatus, CatalogError>;
}

// Implement traits for real clients

#[async_trait]
impl PostSource for InstagramClient {
    async fn fetch_page(
        &self,
        account: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<PostPage, FetchError> {
        self.fetch_page(account, cursor).await
    }
}

#[async_trait]
impl CatalogApi for AppleMusicClient {
    async fn search(
        &self,
        title: &str,
        artist: Option<&str>,
    ) -> Result<Vec<CatalogSong>, CatalogError> {
        self.search(title, artist).await
    }

    async fn add_to_library(&self, catalog_id: &str) -> Result<AddStatus, CatalogError> {
        self.add_to_library(catalog_id).await
    }
}
