use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest topic description accepted for generation, in characters.
pub const TOPIC_MIN_CHARS: usize = 5;
/// Longest topic description accepted for generation, in characters.
pub const TOPIC_MAX_CHARS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic cannot be empty")]
    Empty,

    #[error("topic must be at least {min} characters (got {len})")]
    TooShort { min: usize, len: usize },

    #[error("topic must be at most {max} characters (got {len})")]
    TooLong { max: usize, len: usize },
}

/// Validated lesson topic, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse a free-form topic description.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` if the trimmed text is empty or outside
    /// `TOPIC_MIN_CHARS..=TOPIC_MAX_CHARS`.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, TopicError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TopicError::Empty);
        }
        let len = trimmed.chars().count();
        if len < TOPIC_MIN_CHARS {
            return Err(TopicError::TooShort {
                min: TOPIC_MIN_CHARS,
                len,
            });
        }
        if len > TOPIC_MAX_CHARS {
            return Err(TopicError::TooLong {
                max: TOPIC_MAX_CHARS,
                len,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = TopicError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

/// Where a lesson is generated for. `None` means no school context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Option<String>);

impl Scope {
    #[must_use]
    pub fn global() -> Self {
        Self(None)
    }

    /// Scope generation to a school. Blank ids collapse to the global scope.
    #[must_use]
    pub fn school(id: impl Into<String>) -> Self {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            Self(None)
        } else {
            Self(Some(id.to_owned()))
        }
    }

    #[must_use]
    pub fn school_id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}
