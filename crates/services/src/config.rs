use std::env;

use lesson_core::model::{DEFAULT_INITIAL_BATCH, DEFAULT_STAGE_COUNT};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Where the content API lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl SlideApiConfig {
    /// Read `LESSON_API_BASE_URL` and `LESSON_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("LESSON_API_BASE_URL")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        let api_key = lookup("LESSON_API_KEY")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        Self { base_url, api_key }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::EmptyBaseUrl` for a blank base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into().trim().to_owned();
        if base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Ok(Self { base_url, api_key })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for SlideApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.into(),
            api_key: None,
        }
    }
}

/// Lesson size and how many stages the initial batch covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
    stage_count: usize,
    initial_batch_size: usize,
}

impl GenerationConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBatch` unless `0 < initial_batch_size < stage_count`.
    pub fn new(stage_count: usize, initial_batch_size: usize) -> Result<Self, ConfigError> {
        if initial_batch_size == 0 || initial_batch_size >= stage_count {
            return Err(ConfigError::InvalidBatch {
                stage_count,
                initial_batch_size,
            });
        }
        Ok(Self {
            stage_count,
            initial_batch_size,
        })
    }

    /// Read `LESSON_STAGE_COUNT` and `LESSON_INITIAL_BATCH`, falling back to 14 and 2.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unparsable values or an invalid combination.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let stage_count = read_count(&lookup, "LESSON_STAGE_COUNT", DEFAULT_STAGE_COUNT)?;
        let initial = read_count(&lookup, "LESSON_INITIAL_BATCH", DEFAULT_INITIAL_BATCH)?;
        Self::new(stage_count, initial)
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    #[must_use]
    pub fn initial_batch_size(&self) -> usize {
        self.initial_batch_size
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stage_count: DEFAULT_STAGE_COUNT,
            initial_batch_size: DEFAULT_INITIAL_BATCH,
        }
    }
}

fn read_count(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let api = SlideApiConfig::from_lookup(lookup(&[]));
        assert_eq!(api, SlideApiConfig::default());
        let generation = GenerationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(generation, GenerationConfig::default());
        assert_eq!(generation.stage_count(), 14);
        assert_eq!(generation.initial_batch_size(), 2);
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let api = SlideApiConfig::from_lookup(lookup(&[
            ("LESSON_API_BASE_URL", "https://aulas.example.com/api/"),
            ("LESSON_API_KEY", "   "),
        ]));
        assert!(api.api_key.is_none());
        assert_eq!(
            api.endpoint("aulas/skeleton"),
            "https://aulas.example.com/api/aulas/skeleton"
        );
    }

    #[test]
    fn explicit_base_url_must_not_be_blank() {
        assert_eq!(SlideApiConfig::new("  ", None), Err(ConfigError::EmptyBaseUrl));
        let api = SlideApiConfig::new(" http://127.0.0.1:8080 ", Some("k".into())).unwrap();
        assert_eq!(api.endpoint("aulas/next-slide"), "http://127.0.0.1:8080/aulas/next-slide");
    }

    #[test]
    fn batch_must_be_smaller_than_lesson() {
        assert!(GenerationConfig::new(14, 0).is_err());
        assert!(GenerationConfig::new(2, 2).is_err());
        assert!(GenerationConfig::new(3, 1).is_ok());
    }

    #[test]
    fn unparsable_count_is_reported() {
        let err = GenerationConfig::from_lookup(lookup(&[("LESSON_STAGE_COUNT", "many")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "LESSON_STAGE_COUNT",
                value: "many".into()
            }
        );
    }
}
