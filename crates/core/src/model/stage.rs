use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::media::MediaUrl;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Failure to fetch the content for a single stage.
///
/// Captured on the stage itself; it never aborts the rest of a lesson.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("slide fetch failed: {message}")]
pub struct SlideFetchError {
    pub message: String,
}

impl SlideFetchError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

//
// ─── STAGE KIND ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    #[default]
    Explanation,
    Quiz,
    Interactive,
}

impl StageKind {
    /// Lenient mapping from the labels the content backend uses.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "quiz" | "question" => Self::Quiz,
            "interactive" => Self::Interactive,
            _ => Self::Explanation,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explanation => "explanation",
            Self::Quiz => "quiz",
            Self::Interactive => "interactive",
        }
    }
}

//
// ─── QUESTIONS & SLIDES ────────────────────────────────────────────────────────
//

/// Multiple-choice question attached to a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: Option<String>,
    pub points: u32,
}

/// Content payload for one stage, as produced by the content backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: Option<String>,
    pub kind: StageKind,
    pub content: String,
    pub media: Vec<MediaUrl>,
    pub questions: Vec<Question>,
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// One slide-equivalent unit of a lesson, addressed by a stable index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    index: usize,
    title: String,
    kind: StageKind,
    content: String,
    media: Vec<MediaUrl>,
    questions: Vec<Question>,
    #[serde(default)]
    prerequisites: Vec<usize>,
    is_loading: bool,
    #[serde(default)]
    error: Option<SlideFetchError>,
}

impl Stage {
    /// Skeleton entry awaiting content.
    #[must_use]
    pub fn placeholder(
        index: usize,
        title: impl Into<String>,
        kind: StageKind,
        prerequisites: Vec<usize>,
    ) -> Self {
        Self {
            index,
            title: title.into(),
            kind,
            content: String::new(),
            media: Vec::new(),
            questions: Vec::new(),
            prerequisites,
            is_loading: true,
            error: None,
        }
    }

    /// Copy of this stage filled with `slide`.
    ///
    /// The skeleton title is kept when the slide does not carry its own.
    #[must_use]
    pub fn loaded(&self, slide: Slide) -> Self {
        let title = slide
            .title
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.title.clone());
        Self {
            index: self.index,
            title,
            kind: slide.kind,
            content: slide.content,
            media: slide.media,
            questions: slide.questions,
            prerequisites: self.prerequisites.clone(),
            is_loading: false,
            error: None,
        }
    }

    /// Copy of this stage marked as failed and no longer loading.
    #[must_use]
    pub fn failed(&self, error: SlideFetchError) -> Self {
        Self {
            is_loading: false,
            error: Some(error),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn media(&self) -> &[MediaUrl] {
        &self.media
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn prerequisites(&self) -> &[usize] {
        &self.prerequisites
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&SlideFetchError> {
        self.error.as_ref()
    }

    /// True once real content has been merged in.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.is_loading && self.error.is_none()
    }

    /// Points available from this stage's questions.
    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points))
    }
}
