use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;
use crate::model::stage::{Stage, StageKind};
use crate::model::topic::{Scope, Topic};
use crate::reconcile::{self, ReconcileError, SlideOutcome};

/// Default number of stages in a generated lesson.
pub const DEFAULT_STAGE_COUNT: usize = 14;
/// Default number of stages fetched in the initial batch.
pub const DEFAULT_INITIAL_BATCH: usize = 2;

//
// ─── STATUS & CRITERIA ─────────────────────────────────────────────────────────
//

/// Generation status. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Skeleton,
    InitialReady,
    Complete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCriteria {
    pub min_score: u32,
}

//
// ─── SKELETON ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonStage {
    pub title: String,
    pub kind: StageKind,
    pub prerequisites: Vec<usize>,
}

/// Lesson shell returned by the skeleton phase, before any content arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSkeleton {
    pub title: String,
    pub objectives: Vec<String>,
    pub stages: Vec<SkeletonStage>,
    pub completion: CompletionCriteria,
}

impl LessonSkeleton {
    /// Keep only prerequisites that point at an earlier stage.
    ///
    /// Out-of-range, self and forward references could never be satisfied and
    /// would lock their stage for good. Returns the dropped `(stage, prerequisite)`
    /// pairs.
    pub fn prune_prerequisites(&mut self) -> Vec<(usize, usize)> {
        let mut dropped = Vec::new();
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.prerequisites.retain(|&p| {
                let keep = p < index;
                if !keep {
                    dropped.push((index, p));
                }
                keep
            });
            stage.prerequisites.sort_unstable();
            stage.prerequisites.dedup();
        }
        dropped
    }
}

//
// ─── DOCUMENT ──────────────────────────────────────────────────────────────────
//

/// The assembled lesson.
///
/// `stages` has a fixed length from the skeleton onwards; merges replace
/// entries in place and leave untouched entries shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDocument {
    id: LessonId,
    topic: Topic,
    #[serde(default)]
    scope: Scope,
    title: String,
    objectives: Vec<String>,
    stages: Vec<Arc<Stage>>,
    status: DocumentStatus,
    loaded_count: usize,
    #[serde(default)]
    completion: CompletionCriteria,
}

impl LessonDocument {
    /// Builds the placeholder document: every stage loading, status `Skeleton`.
    #[must_use]
    pub fn from_skeleton(id: LessonId, topic: Topic, scope: Scope, skeleton: LessonSkeleton) -> Self {
        let stages = skeleton
            .stages
            .into_iter()
            .enumerate()
            .map(|(index, s)| Arc::new(Stage::placeholder(index, s.title, s.kind, s.prerequisites)))
            .collect();
        Self {
            id,
            topic,
            scope,
            title: skeleton.title,
            objectives: skeleton.objectives,
            stages,
            status: DocumentStatus::Skeleton,
            loaded_count: 0,
            completion: skeleton.completion,
        }
    }

    /// Folds `outcomes` into a copy of this document and advances its status.
    ///
    /// A status older than the current one is ignored.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::IndexOutOfRange` if an outcome addresses a stage
    /// outside the document.
    pub fn merged(
        &self,
        outcomes: &[SlideOutcome],
        status: DocumentStatus,
    ) -> Result<Self, ReconcileError> {
        let stages = reconcile::merge_batch(&self.stages, outcomes)?;
        let loaded_count = stages.iter().filter(|s| !s.is_loading()).count();
        Ok(Self {
            stages,
            loaded_count,
            status: self.status.max(status),
            ..self.clone()
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn stages(&self) -> &[Arc<Stage>] {
        &self.stages
    }

    #[must_use]
    pub fn stage(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    #[must_use]
    pub fn completion(&self) -> CompletionCriteria {
        self.completion
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == DocumentStatus::Complete
    }

    /// Indices of stages that are still waiting for content.
    #[must_use]
    pub fn pending_indices(&self) -> Vec<usize> {
        self.stages
            .iter()
            .filter(|s| s.is_loading())
            .map(|s| s.index())
            .collect()
    }

    /// Stages whose fetch failed. The lesson stays playable around them.
    pub fn failed_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| s.error().is_some())
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_stages().next().is_some()
    }

    /// Shape the progress reducer needs: stage count, gating and pass mark.
    #[must_use]
    pub fn outline(&self) -> LessonOutline {
        LessonOutline {
            prerequisites: self
                .stages
                .iter()
                .map(|s| s.prerequisites().to_vec())
                .collect(),
            min_score: self.completion.min_score,
        }
    }
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// Structure of a lesson as seen by progress tracking.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LessonOutline {
    prerequisites: Vec<Vec<usize>>,
    min_score: u32,
}

impl LessonOutline {
    #[must_use]
    pub fn new(prerequisites: Vec<Vec<usize>>, min_score: u32) -> Self {
        Self {
            prerequisites,
            min_score,
        }
    }

    /// `stage_count` stages with no gating.
    #[must_use]
    pub fn ungated(stage_count: usize, min_score: u32) -> Self {
        Self::new(vec![Vec::new(); stage_count], min_score)
    }

    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.prerequisites.len()
    }

    #[must_use]
    pub fn prerequisites(&self, stage_index: usize) -> &[usize] {
        self.prerequisites
            .get(stage_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn min_score(&self) -> u32 {
        self.min_score
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn skeleton(count: usize) -> LessonSkeleton {
        LessonSkeleton {
            title: "Fotossíntese".into(),
            objectives: vec!["Entender a clorofila".into()],
            stages: (0..count)
                .map(|i| SkeletonStage {
                    title: format!("Etapa {}", i + 1),
                    kind: StageKind::Explanation,
                    prerequisites: if i == 0 { Vec::new() } else { vec![i - 1] },
                })
                .collect(),
            completion: CompletionCriteria { min_score: 70 },
        }
    }

    pub fn document(count: usize) -> LessonDocument {
        LessonDocument::from_skeleton(
            LessonId::new("lesson-1").unwrap(),
            Topic::parse("Fotossíntese").unwrap(),
            Scope::global(),
            skeleton(count),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::document;
    use super::*;
    use crate::model::stage::{Slide, SlideFetchError};

    fn slide(content: &str) -> Slide {
        Slide {
            title: None,
            kind: StageKind::Explanation,
            content: content.into(),
            media: Vec::new(),
            questions: Vec::new(),
        }
    }

    #[test]
    fn unsatisfiable_prerequisites_are_pruned() {
        let mut skeleton = super::fixtures::skeleton(4);
        skeleton.stages[1].prerequisites = vec![99, 0, 0];
        skeleton.stages[2].prerequisites = vec![2];
        skeleton.stages[3].prerequisites = vec![3, 1, 2];

        let dropped = skeleton.prune_prerequisites();

        assert_eq!(dropped, vec![(1, 99), (2, 2), (3, 3)]);
        assert_eq!(skeleton.stages[0].prerequisites, Vec::<usize>::new());
        assert_eq!(skeleton.stages[1].prerequisites, vec![0]);
        assert!(skeleton.stages[2].prerequisites.is_empty());
        assert_eq!(skeleton.stages[3].prerequisites, vec![1, 2]);
    }

    #[test]
    fn skeleton_has_fixed_length_and_all_loading() {
        let doc = document(14);
        assert_eq!(doc.stage_count(), 14);
        assert_eq!(doc.loaded_count(), 0);
        assert_eq!(doc.pending_indices().len(), 14);
        assert_eq!(doc.status(), DocumentStatus::Skeleton);
    }

    #[test]
    fn merged_counts_loaded_and_advances_status() {
        let doc = document(4);
        let next = doc
            .merged(
                &[
                    SlideOutcome::loaded(0, slide("a")),
                    SlideOutcome::failed(2, SlideFetchError::new("boom")),
                ],
                DocumentStatus::InitialReady,
            )
            .unwrap();
        assert_eq!(next.stage_count(), 4);
        assert_eq!(next.loaded_count(), 2);
        assert_eq!(next.pending_indices(), vec![1, 3]);
        assert!(next.has_failures());
        assert_eq!(next.status(), DocumentStatus::InitialReady);

        let still = next.merged(&[], DocumentStatus::Skeleton).unwrap();
        assert_eq!(still.status(), DocumentStatus::InitialReady);
    }

    #[test]
    fn outline_carries_prerequisites_and_min_score() {
        let outline = document(3).outline();
        assert_eq!(outline.stage_count(), 3);
        assert_eq!(outline.prerequisites(2), &[1]);
        assert_eq!(outline.prerequisites(99), &[] as &[usize]);
        assert_eq!(outline.min_score(), 70);
    }

    #[test]
    fn document_roundtrips_through_json() {
        let doc = document(3)
            .merged(&[SlideOutcome::loaded(1, slide("b"))], DocumentStatus::InitialReady)
            .unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let back: LessonDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
