#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lesson_core::model::{
    CompletionCriteria, LessonSkeleton, Scope, SkeletonStage, Slide, StageKind, Topic,
};
use services::{SlideClient, SlideClientError, SlideResponse};
use tokio::sync::{Notify, watch};

pub fn slide(index: usize) -> Slide {
    Slide {
        title: Some(format!("Slide {}", index + 1)),
        kind: StageKind::Explanation,
        content: format!("Conteúdo {index}"),
        media: Vec::new(),
        questions: Vec::new(),
    }
}

/// Scripted content API.
#[derive(Default)]
pub struct FakeSlideClient {
    stage_count: usize,
    initial_slides: usize,
    min_score: u32,
    failing: HashSet<usize>,
    prerequisites: HashMap<usize, Vec<usize>>,
    unreachable: HashSet<usize>,
    skeleton_down: bool,
    initial_down: bool,
    skeleton_calls: AtomicUsize,
    requested: Mutex<Vec<usize>>,
}

impl FakeSlideClient {
    pub fn new(stage_count: usize, initial_slides: usize) -> Self {
        Self {
            stage_count,
            initial_slides,
            ..Self::default()
        }
    }

    pub fn failing_slide(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn prerequisites(mut self, index: usize, prerequisites: Vec<usize>) -> Self {
        self.prerequisites.insert(index, prerequisites);
        self
    }

    pub fn unreachable_slide(mut self, index: usize) -> Self {
        self.unreachable.insert(index);
        self
    }

    pub fn skeleton_down(mut self) -> Self {
        self.skeleton_down = true;
        self
    }

    pub fn initial_down(mut self) -> Self {
        self.initial_down = true;
        self
    }

    pub fn min_score(mut self, min_score: u32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn skeleton_calls(&self) -> usize {
        self.skeleton_calls.load(Ordering::SeqCst)
    }

    pub fn requested_slides(&self) -> Vec<usize> {
        let mut seen = self.requested.lock().unwrap().clone();
        seen.sort_unstable();
        seen
    }
}

#[async_trait]
impl SlideClient for FakeSlideClient {
    async fn fetch_skeleton(
        &self,
        _topic: &Topic,
        _scope: &Scope,
    ) -> Result<LessonSkeleton, SlideClientError> {
        self.skeleton_calls.fetch_add(1, Ordering::SeqCst);
        if self.skeleton_down {
            return Err(SlideClientError::HttpStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(LessonSkeleton {
            title: "Aula gerada".into(),
            objectives: vec!["Aprender".into()],
            stages: (0..self.stage_count)
                .map(|i| SkeletonStage {
                    title: format!("Etapa {}", i + 1),
                    kind: StageKind::Explanation,
                    prerequisites: self.prerequisites.get(&i).cloned().unwrap_or_else(|| {
                        if i == 0 { Vec::new() } else { vec![i - 1] }
                    }),
                })
                .collect(),
            completion: CompletionCriteria {
                min_score: self.min_score,
            },
        })
    }

    async fn fetch_initial_slides(
        &self,
        _topic: &Topic,
        _scope: &Scope,
    ) -> Result<Vec<Slide>, SlideClientError> {
        if self.initial_down {
            return Err(SlideClientError::Decode("no slides field".into()));
        }
        Ok((0..self.initial_slides).map(slide).collect())
    }

    async fn fetch_slide(
        &self,
        _topic: &Topic,
        index: usize,
        _scope: &Scope,
    ) -> Result<SlideResponse, SlideClientError> {
        self.requested.lock().unwrap().push(index);
        if self.unreachable.contains(&index) {
            return Err(SlideClientError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY));
        }
        if self.failing.contains(&index) {
            return Ok(SlideResponse::Failed(format!("slide {} timed out", index + 1)));
        }
        Ok(SlideResponse::Loaded(slide(index)))
    }
}

/// Holds remaining-batch requests for one topic until the gate opens.
///
/// With `gated_index` set only that slide is held; the others answer at once.
pub struct GatedSlideClient {
    pub inner: FakeSlideClient,
    pub gated_topic: String,
    pub gated_index: Option<usize>,
    pub gate: watch::Receiver<bool>,
    pub reached: Arc<Notify>,
}

#[async_trait]
impl SlideClient for GatedSlideClient {
    async fn fetch_skeleton(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<LessonSkeleton, SlideClientError> {
        self.inner.fetch_skeleton(topic, scope).await
    }

    async fn fetch_initial_slides(
        &self,
        topic: &Topic,
        scope: &Scope,
    ) -> Result<Vec<Slide>, SlideClientError> {
        self.inner.fetch_initial_slides(topic, scope).await
    }

    async fn fetch_slide(
        &self,
        topic: &Topic,
        index: usize,
        scope: &Scope,
    ) -> Result<SlideResponse, SlideClientError> {
        let held = topic.as_str() == self.gated_topic
            && self.gated_index.is_none_or(|gated| gated == index);
        if held {
            self.reached.notify_one();
            let mut gate = self.gate.clone();
            loop {
                if *gate.borrow_and_update() {
                    break;
                }
                if gate.changed().await.is_err() {
                    break;
                }
            }
        }
        self.inner.fetch_slide(topic, index, scope).await
    }
}
