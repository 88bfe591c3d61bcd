//! Opaque cursor for resuming a partition scan.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a caller-supplied [`ContinuationToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContinuationTokenError {
    #[error("continuation token cannot be empty")]
    Empty,
    #[error("continuation token is not valid base64url")]
    Encoding,
    #[error("continuation token does not decode to a row key")]
    NotUtf8,
}

/// Cursor returned by a partial scan.
///
/// The token names the last row key already returned; the next scan resumes
/// strictly after it. Callers treat it as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContinuationToken {
    resume_after: String,
}

impl ContinuationToken {
    /// Build a token that resumes after `row_key`.
    #[must_use]
    pub fn after(row_key: impl Into<String>) -> Self {
        Self {
            resume_after: row_key.into(),
        }
    }

    /// Parse a token previously produced by [`ContinuationToken::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not base64url, or not UTF-8.
    pub fn parse(token: &str) -> Result<Self, ContinuationTokenError> {
        if token.is_empty() {
            return Err(ContinuationTokenError::Empty);
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ContinuationTokenError::Encoding)?;
        let resume_after = String::from_utf8(bytes).map_err(|_| ContinuationTokenError::NotUtf8)?;
        Ok(Self { resume_after })
    }

    /// The opaque wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.resume_after.as_bytes())
    }

    /// The row key the next scan starts after.
    #[must_use]
    pub fn resume_after(&self) -> &str {
        &self.resume_after
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl TryFrom<String> for ContinuationToken {
    type Error = ContinuationTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContinuationToken> for String {
    fn from(token: ContinuationToken) -> Self {
        token.encode()
    }
}
