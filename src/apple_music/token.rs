//! Apple Music developer tokens.
//!
//! Requests to the Apple Music API carry a developer token: an ES256-signed JWT
//! issued by the developer's team and signed with a MusicKit private key
//! (`AuthKey_<KEY_ID>.p8`). Apple accepts tokens valid for up to 180 days.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Longest lifetime Apple accepts for a developer token
pub const TOKEN_LIFETIME_DAYS: i64 = 180;

/// Errors that can occur while preparing a developer token
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Developer token is empty")]
    Empty,

    #[error("Cannot read private key {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid MusicKit private key (expected a PKCS#8 .p8 file): {0}")]
    InvalidKey(String),

    #[error("Failed to sign developer token: {0}")]
    Sign(String),
}

/// JWT claims of a developer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Team ID
    pub iss: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// A signed developer token. The value is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct DeveloperToken(String);

impl DeveloperToken {
    /// Use a pre-generated token as is.
    pub fn from_string(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Self(token))
    }

    /// Sign a new token with a PEM-encoded MusicKit key.
    pub fn generate(team_id: &str, key_id: &str, private_key_pem: &[u8]) -> Result<Self, TokenError> {
        let key = EncodingKey::from_ec_pem(private_key_pem)
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(key_id.to_string());

        let now = Utc::now();
        let claims = Claims {
            iss: team_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
        };

        let token = jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| TokenError::Sign(e.to_string()))?;

        tracing::info!(key_id, "Generated developer token valid for {} days", TOKEN_LIFETIME_DAYS);
        Ok(Self(token))
    }

    /// Sign a new token with the key stored at `path`.
    pub fn from_key_file(team_id: &str, key_id: &str, path: &Path) -> Result<Self, TokenError> {
        let pem = std::fs::read(path).map_err(|source| TokenError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::generate(team_id, key_id, &pem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeveloperToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeveloperToken(<redacted>)")
    }
}
