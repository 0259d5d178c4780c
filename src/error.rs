//! Application-wide error types.
//!
//! Subsystems define their own `thiserror` enums ([`FetchError`],
//! [`CatalogError`], [`ConfigError`], [`TokenError`], [`ReportError`]); this
//! module aggregates them. The CLI layer converts to `anyhow`.
//!
//! [`FetchError`]: crate::instagram::FetchError
//! [`CatalogError`]: crate::apple_music::CatalogError
//! [`ConfigError`]: crate::config::ConfigError
//! [`TokenError`]: crate::apple_music::TokenError
//! [`ReportError`]: crate::pipeline::ReportError

use crate::apple_music::{CatalogError, TokenError};
use crate::config::ConfigError;
use crate::instagram::FetchError;
use crate::pipeline::ReportError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading posts failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Catalog search or library update failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Invalid or missing settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Developer token could not be prepared
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Report export failed
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error ends the run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Fetch(e) => e.is_fatal(),
            Error::Catalog(e) => e.is_fatal(),
            Error::WithContext { source, .. } => source.is_fatal(),
            Error::Config(_) | Error::Token(_) => true,
            Error::Report(_) => false,
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, ReportError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Report(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, TokenError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Token(e).context(ctx))
    }
}
