//! Apple Music integration - the catalog client.
//!
//! Searches the Apple Music catalog and adds songs to the user's library.
//!
//! ## Credentials
//! - A developer token authenticates the app (see [`token`]).
//! - A `Music-User-Token` authorizes changes to one user's library. Searching
//!   works without it.

pub mod dto;
mod adapter;
mod client;
pub mod token;

pub use client::AppleMusicClient;
pub use token::{DeveloperToken, TokenError};

/// Default storefront (country) used for catalog lookups
pub const DEFAULT_STOREFRONT: &str = "us";

/// Errors that can occur while talking to the catalog
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error(
        "Apple Music rejected the credentials ({0}). Check the developer token \
         and regenerate the Music-User-Token if it expired"
    )]
    Auth(String),

    #[error("Apple Music rate limit reached - try again later")]
    RateLimited,

    #[error("Apple Music unavailable: {0}")]
    Transient(String),

    #[error("Apple Music API error: {0}")]
    Api(String),

    #[error("Failed to parse Apple Music response: {0}")]
    Parse(String),

    #[error("A Music-User-Token is required to modify the library")]
    NoUserToken,
}

impl CatalogError {
    /// Worth retrying after the fixed delay
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient(_) | CatalogError::RateLimited)
    }

    /// Stops the run; retrying later (or new credentials) is the only fix
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::Auth(_) | CatalogError::RateLimited | CatalogError::NoUserToken
        )
    }
}
