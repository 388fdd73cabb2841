use lesson_core::model::{
    CompletionCriteria, LessonSkeleton, MediaUrl, Question, SkeletonStage, Slide, StageKind,
};
use serde::{Deserialize, Serialize};

use super::SlideResponse;
use crate::error::SlideClientError;

const DEFAULT_QUESTION_POINTS: u32 = 10;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TopicRequest<'a> {
    pub topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NextSlideRequest<'a> {
    pub topic: &'a str,
    /// 1-based position in the lesson.
    pub slide_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<&'a str>,
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(super) struct SkeletonEnvelope {
    skeleton: WireSkeleton,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSkeleton {
    title: String,
    #[serde(default)]
    objectives: Vec<String>,
    stages: Vec<WireSkeletonStage>,
    #[serde(default)]
    completion_criteria: Option<WireCompletion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSkeletonStage {
    #[serde(alias = "etapa")]
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    prerequisites: Vec<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCompletion {
    #[serde(default)]
    min_score: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct InitialSlidesEnvelope {
    slides: Vec<WireSlide>,
}

/// `{success, slide?, error?}`; the flag decides which field must be present.
#[derive(Debug, Deserialize)]
pub(super) struct NextSlideEnvelope {
    success: bool,
    #[serde(default)]
    slide: Option<WireSlide>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSlide {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    media: Vec<String>,
    #[serde(default)]
    questions: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    #[serde(alias = "question")]
    prompt: String,
    options: Vec<String>,
    #[serde(alias = "correctOption")]
    correct: usize,
    #[serde(default, alias = "correctAnswer")]
    explanation: String,
    #[serde(default, alias = "helpMessage")]
    hint: Option<String>,
    #[serde(default)]
    points: Option<u32>,
}

//
// ─── CONVERSIONS ───────────────────────────────────────────────────────────────
//

impl From<SkeletonEnvelope> for LessonSkeleton {
    fn from(envelope: SkeletonEnvelope) -> Self {
        let wire = envelope.skeleton;
        Self {
            title: wire.title,
            objectives: wire.objectives,
            stages: wire
                .stages
                .into_iter()
                .map(|s| SkeletonStage {
                    title: s.title,
                    kind: StageKind::from_label(&s.kind),
                    prerequisites: s.prerequisites,
                })
                .collect(),
            completion: CompletionCriteria {
                min_score: wire.completion_criteria.map_or(0, |c| c.min_score),
            },
        }
    }
}

impl From<InitialSlidesEnvelope> for Vec<Slide> {
    fn from(envelope: InitialSlidesEnvelope) -> Self {
        envelope.slides.into_iter().map(Slide::from).collect()
    }
}

impl TryFrom<NextSlideEnvelope> for SlideResponse {
    type Error = SlideClientError;

    fn try_from(envelope: NextSlideEnvelope) -> Result<Self, Self::Error> {
        match (envelope.success, envelope.slide) {
            (true, Some(slide)) => Ok(Self::Loaded(slide.into())),
            (true, None) => Err(SlideClientError::Decode(
                "success response without a slide".into(),
            )),
            (false, _) => Ok(Self::Failed(
                envelope
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "slide generation failed".into()),
            )),
        }
    }
}

impl From<WireSlide> for Slide {
    fn from(wire: WireSlide) -> Self {
        let media = wire
            .image_url
            .into_iter()
            .chain(wire.media)
            .filter_map(|raw| match MediaUrl::parse(&raw) {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(url = %raw, error = %err, "dropping invalid media url");
                    None
                }
            })
            .collect();
        Self {
            title: wire.title,
            kind: StageKind::from_label(&wire.kind),
            content: wire.content,
            media,
            questions: wire.questions.into_iter().map(Question::from).collect(),
        }
    }
}

impl From<WireQuestion> for Question {
    fn from(wire: WireQuestion) -> Self {
        Self {
            prompt: wire.prompt,
            options: wire.options,
            correct: wire.correct,
            explanation: wire.explanation,
            hint: wire.hint,
            points: wire.points.unwrap_or(DEFAULT_QUESTION_POINTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_next(value: serde_json::Value) -> Result<SlideResponse, SlideClientError> {
        let envelope: NextSlideEnvelope = serde_json::from_value(value)
            .map_err(|e| SlideClientError::Decode(e.to_string()))?;
        SlideResponse::try_from(envelope)
    }

    #[test]
    fn skeleton_accepts_etapa_labels() {
        let envelope: SkeletonEnvelope = serde_json::from_value(json!({
            "skeleton": {
                "title": "Fotossíntese",
                "objectives": ["Entender a luz"],
                "stages": [
                    { "etapa": "Abertura", "type": "explanation" },
                    { "title": "Quiz", "type": "question", "prerequisites": [0] }
                ],
                "completionCriteria": { "minScore": 70 }
            }
        }))
        .unwrap();
        let skeleton = LessonSkeleton::from(envelope);
        assert_eq!(skeleton.stages.len(), 2);
        assert_eq!(skeleton.stages[0].title, "Abertura");
        assert_eq!(skeleton.stages[1].kind, StageKind::Quiz);
        assert_eq!(skeleton.stages[1].prerequisites, vec![0]);
        assert_eq!(skeleton.completion.min_score, 70);
    }

    #[test]
    fn slide_collects_valid_media_only() {
        let envelope: InitialSlidesEnvelope = serde_json::from_value(json!({
            "slides": [{
                "type": "explanation",
                "content": "Luz solar",
                "imageUrl": "https://images.example.com/sol.png",
                "media": ["not a url"]
            }]
        }))
        .unwrap();
        let slides = Vec::<Slide>::from(envelope);
        assert_eq!(slides[0].media.len(), 1);
        assert_eq!(slides[0].media[0].as_str(), "https://images.example.com/sol.png");
    }

    #[test]
    fn question_aliases_and_default_points() {
        let response = decode_next(json!({
            "success": true,
            "slide": {
                "type": "quiz",
                "content": "Pergunta",
                "questions": [{
                    "question": "Qual gás é liberado?",
                    "options": ["O2", "CO2"],
                    "correctOption": 0,
                    "helpMessage": "Respiramos ele"
                }]
            }
        }))
        .unwrap();
        let SlideResponse::Loaded(slide) = response else {
            panic!("expected a loaded slide");
        };
        assert_eq!(slide.questions[0].prompt, "Qual gás é liberado?");
        assert_eq!(slide.questions[0].hint.as_deref(), Some("Respiramos ele"));
        assert_eq!(slide.questions[0].points, DEFAULT_QUESTION_POINTS);
    }

    #[test]
    fn failure_shape_is_not_an_error() {
        let response = decode_next(json!({ "success": false, "error": "quota" })).unwrap();
        assert_eq!(response, SlideResponse::Failed("quota".into()));
    }

    #[test]
    fn ambiguous_bodies_are_decode_errors() {
        assert!(matches!(
            decode_next(json!({ "success": true })),
            Err(SlideClientError::Decode(_))
        ));
        assert!(matches!(
            decode_next(json!({ "slide": { "content": "x" } })),
            Err(SlideClientError::Decode(_))
        ));
    }

    #[test]
    fn next_slide_request_is_one_based_camel_case() {
        let body = serde_json::to_value(NextSlideRequest {
            topic: "Frações",
            slide_number: 3,
            school_id: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "topic": "Frações", "slideNumber": 3 }));
    }
}
