use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaValidationError {
    #[error("media URL cannot be empty")]
    Empty,

    #[error("media URL is not absolute: {0}")]
    NotAbsolute(String),

    #[error("unsupported media scheme: {0}")]
    UnsupportedScheme(String),
}

//
// ─── MEDIA URL ─────────────────────────────────────────────────────────────────
//

/// Absolute http(s) or data URL pointing at a stage illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaUrl(Url);

impl MediaUrl {
    /// Parse and validate a media URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaValidationError` if the value is blank, relative, or uses a
    /// scheme other than `http`, `https` or `data`.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, MediaValidationError> {
        let s = raw.as_ref().trim();
        if s.is_empty() {
            return Err(MediaValidationError::Empty);
        }
        let url = Url::parse(s).map_err(|_| MediaValidationError::NotAbsolute(s.to_owned()))?;
        match url.scheme() {
            "http" | "https" | "data" => Ok(Self(url)),
            other => Err(MediaValidationError::UnsupportedScheme(other.to_owned())),
        }
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
