use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest score a stage result can carry.
pub const MAX_SCORE: u32 = 100;

//
// ─── STAGE RESULT ──────────────────────────────────────────────────────────────
//

/// What the player reports when a learner finishes a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSubmission {
    pub points: u32,
    pub time_spent_seconds: u64,
    pub attempts: Option<u32>,
    pub score: Option<u32>,
}

impl StageSubmission {
    #[must_use]
    pub fn new(points: u32, time_spent_seconds: u64) -> Self {
        Self {
            points,
            time_spent_seconds,
            attempts: None,
            score: None,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = Some(score);
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

/// Recorded outcome for one stage. At most one per stage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub points_earned: u32,
    pub time_spent_seconds: u64,
    pub attempts: u32,
    pub score: u32,
    pub completed_at: DateTime<Utc>,
}

impl StageResult {
    /// Normalize a submission: at least one attempt, score within `0..=MAX_SCORE`.
    #[must_use]
    pub fn from_submission(submission: StageSubmission, completed_at: DateTime<Utc>) -> Self {
        Self {
            points_earned: submission.points,
            time_spent_seconds: submission.time_spent_seconds,
            attempts: submission.attempts.unwrap_or(1).max(1),
            score: submission.score.unwrap_or(0).min(MAX_SCORE),
            completed_at,
        }
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Resumable learner state for one lesson.
///
/// Totals are maintained by delta against the replaced entry, so they always
/// equal the sums over `stage_results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub(crate) current_stage_index: usize,
    pub(crate) stage_results: BTreeMap<usize, StageResult>,
    pub(crate) total_points: u64,
    pub(crate) total_time_spent: u64,
    pub(crate) is_completed: bool,
    #[serde(default)]
    pub(crate) completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) bookmarked: bool,
    pub(crate) last_accessed_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Fresh record for a first visit.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_stage_index: 0,
            stage_results: BTreeMap::new(),
            total_points: 0,
            total_time_spent: 0,
            is_completed: false,
            completed_at: None,
            bookmarked: false,
            last_accessed_at: now,
        }
    }

    #[must_use]
    pub fn current_stage_index(&self) -> usize {
        self.current_stage_index
    }

    #[must_use]
    pub fn stage_results(&self) -> &BTreeMap<usize, StageResult> {
        &self.stage_results
    }

    #[must_use]
    pub fn result_for(&self, stage_index: usize) -> Option<&StageResult> {
        self.stage_results.get(&stage_index)
    }

    #[must_use]
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    #[must_use]
    pub fn total_time_spent(&self) -> u64 {
        self.total_time_spent
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.stage_results.len()
    }

    /// Position through the lesson as a rounded percentage of `total_stages`.
    #[must_use]
    pub fn completion_percentage(&self, total_stages: usize) -> u32 {
        if total_stages == 0 {
            return 0;
        }
        let reached = (self.current_stage_index + 1).min(total_stages);
        let pct = (reached * 100 + total_stages / 2) / total_stages;
        u32::try_from(pct).unwrap_or(100)
    }

    /// Mean score over recorded stages, `None` before the first result.
    #[must_use]
    pub fn average_score(&self) -> Option<f64> {
        if self.stage_results.is_empty() {
            return None;
        }
        let sum: u64 = self.stage_results.values().map(|r| u64::from(r.score)).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum as f64 / self.stage_results.len() as f64)
    }
}

//
// ─── STAGE STATUS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Locked,
    Available,
    Current,
    Completed,
}

impl StageStatus {
    /// Whether the learner may move to a stage in this status.
    #[must_use]
    pub fn is_reachable(self) -> bool {
        !matches!(self, Self::Locked)
    }
}
