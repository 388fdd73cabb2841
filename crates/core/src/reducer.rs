//! Progress state machine.
//!
//! Every mutation of `LessonProgress` goes through a pure function here; the
//! store in `services` only loads, dispatches and persists.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{LessonOutline, LessonProgress, StageResult, StageStatus, StageSubmission};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("stage {index} does not exist (lesson has {count} stages)")]
    StageOutOfRange { index: usize, count: usize },

    #[error("stage {index} is locked until its prerequisites are completed")]
    StageLocked { index: usize },
}

/// Learner actions the player reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Navigated { stage_index: usize },
    StageCompleted {
        stage_index: usize,
        submission: StageSubmission,
    },
    BookmarkToggled,
    Restarted,
}

//
// ─── OPERATIONS ────────────────────────────────────────────────────────────────
//

/// Replace the result for `stage_index` and adjust totals by the delta against
/// the previous entry. Totals never go below zero.
#[must_use]
pub fn record_stage_result(
    progress: &LessonProgress,
    stage_index: usize,
    result: StageResult,
) -> LessonProgress {
    let mut next = progress.clone();
    let previous = next.stage_results.insert(stage_index, result);

    let (old_points, old_time) =
        previous.map_or((0, 0), |r| (r.points_earned, r.time_spent_seconds));
    next.total_points = apply_delta(
        next.total_points,
        i128::from(result.points_earned) - i128::from(old_points),
    );
    next.total_time_spent = apply_delta(
        next.total_time_spent,
        i128::from(result.time_spent_seconds) - i128::from(old_time),
    );
    next.last_accessed_at = result.completed_at;
    next
}

fn apply_delta(total: u64, delta: i128) -> u64 {
    let value = (i128::from(total) + delta).max(0);
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Status precedence: completed, then current, then locked, then available.
#[must_use]
pub fn derive_stage_status(
    progress: &LessonProgress,
    stage_index: usize,
    prerequisites: &[usize],
) -> StageStatus {
    if progress.stage_results.contains_key(&stage_index) {
        StageStatus::Completed
    } else if progress.current_stage_index == stage_index {
        StageStatus::Current
    } else if prerequisites
        .iter()
        .any(|p| !progress.stage_results.contains_key(p))
    {
        StageStatus::Locked
    } else {
        StageStatus::Available
    }
}

/// True once every stage has a result scoring at least `min_score`.
///
/// A lesson with no stages is never complete.
#[must_use]
pub fn compute_completion(progress: &LessonProgress, total_stages: usize, min_score: u32) -> bool {
    if total_stages == 0 {
        return false;
    }
    let in_range = progress
        .stage_results
        .range(..total_stages)
        .map(|(_, r)| r)
        .collect::<Vec<_>>();
    in_range.len() >= total_stages && in_range.iter().all(|r| r.score >= min_score)
}

#[must_use]
pub fn toggle_bookmark(progress: &LessonProgress, now: DateTime<Utc>) -> LessonProgress {
    LessonProgress {
        bookmarked: !progress.bookmarked,
        last_accessed_at: now,
        ..progress.clone()
    }
}

/// Move the learner to `stage_index`. Never completes a stage.
///
/// # Errors
///
/// Returns `ProgressError::StageOutOfRange` for an index past the outline and
/// `ProgressError::StageLocked` while a prerequisite lacks a result.
pub fn navigate(
    progress: &LessonProgress,
    outline: &LessonOutline,
    stage_index: usize,
    now: DateTime<Utc>,
) -> Result<LessonProgress, ProgressError> {
    ensure_reachable(progress, outline, stage_index)?;
    Ok(LessonProgress {
        current_stage_index: stage_index,
        last_accessed_at: now,
        ..progress.clone()
    })
}

#[must_use]
pub fn restart(now: DateTime<Utc>) -> LessonProgress {
    LessonProgress::new(now)
}

/// Apply one event to `progress`.
///
/// `StageCompleted` records the result and re-evaluates completion:
/// `completed_at` is stamped the first time the lesson completes, kept while it
/// stays complete and cleared if a re-attempt drops below the pass mark.
///
/// # Errors
///
/// Returns `ProgressError` when the event addresses a stage outside the
/// outline, or navigates to or completes a locked stage.
pub fn apply(
    progress: &LessonProgress,
    outline: &LessonOutline,
    event: ProgressEvent,
    now: DateTime<Utc>,
) -> Result<LessonProgress, ProgressError> {
    match event {
        ProgressEvent::Navigated { stage_index } => navigate(progress, outline, stage_index, now),
        ProgressEvent::StageCompleted {
            stage_index,
            submission,
        } => {
            ensure_reachable(progress, outline, stage_index)?;
            let result = StageResult::from_submission(submission, now);
            let mut next = record_stage_result(progress, stage_index, result);
            let done = compute_completion(&next, outline.stage_count(), outline.min_score());
            next.completed_at = match (done, progress.is_completed) {
                (true, true) => progress.completed_at.or(Some(now)),
                (true, false) => Some(now),
                (false, _) => None,
            };
            next.is_completed = done;
            Ok(next)
        }
        ProgressEvent::BookmarkToggled => Ok(toggle_bookmark(progress, now)),
        ProgressEvent::Restarted => Ok(restart(now)),
    }
}

/// Completed stages stay reachable, so re-attempts are always allowed.
fn ensure_reachable(
    progress: &LessonProgress,
    outline: &LessonOutline,
    stage_index: usize,
) -> Result<(), ProgressError> {
    ensure_in_range(outline, stage_index)?;
    let status = derive_stage_status(progress, stage_index, outline.prerequisites(stage_index));
    if status.is_reachable() {
        Ok(())
    } else {
        Err(ProgressError::StageLocked { index: stage_index })
    }
}

fn ensure_in_range(outline: &LessonOutline, stage_index: usize) -> Result<(), ProgressError> {
    let count = outline.stage_count();
    if stage_index >= count {
        return Err(ProgressError::StageOutOfRange {
            index: stage_index,
            count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;
    use proptest::prelude::*;

    fn result(points: u32, time: u64, score: u32) -> StageResult {
        StageResult::from_submission(
            StageSubmission::new(points, time).with_score(score),
            fixed_now(),
        )
    }

    fn completed(stage_index: usize, points: u32, score: u32) -> ProgressEvent {
        ProgressEvent::StageCompleted {
            stage_index,
            submission: StageSubmission::new(points, 10).with_score(score),
        }
    }

    #[test]
    fn reattempt_adjusts_totals_by_delta() {
        let p = LessonProgress::new(fixed_now());
        let p = record_stage_result(&p, 0, result(10, 30, 80));
        assert_eq!((p.total_points(), p.total_time_spent()), (10, 30));

        let p = record_stage_result(&p, 0, result(5, 10, 80));
        assert_eq!((p.total_points(), p.total_time_spent()), (5, 10));
        assert_eq!(p.stage_results().len(), 1);
    }

    #[test]
    fn totals_clamp_at_zero_for_inconsistent_records() {
        let mut p = LessonProgress::new(fixed_now());
        p.stage_results.insert(0, result(50, 50, 0));
        // totals left at zero, as if hand-edited
        let p = record_stage_result(&p, 0, result(10, 10, 0));
        assert_eq!(p.total_points(), 0);
        assert_eq!(p.total_time_spent(), 0);
    }

    #[test]
    fn status_precedence() {
        let p = LessonProgress::new(fixed_now());
        assert_eq!(derive_stage_status(&p, 0, &[]), StageStatus::Current);
        assert_eq!(derive_stage_status(&p, 2, &[1]), StageStatus::Locked);
        assert_eq!(derive_stage_status(&p, 2, &[]), StageStatus::Available);

        let p = record_stage_result(&p, 1, result(1, 1, 100));
        assert_eq!(derive_stage_status(&p, 2, &[1]), StageStatus::Available);
        assert_eq!(derive_stage_status(&p, 1, &[]), StageStatus::Completed);
    }

    #[test]
    fn completed_wins_over_current() {
        let p = record_stage_result(&LessonProgress::new(fixed_now()), 0, result(1, 1, 1));
        assert_eq!(derive_stage_status(&p, 0, &[]), StageStatus::Completed);
    }

    #[test]
    fn navigation_rejects_locked_and_out_of_range() {
        let outline = LessonOutline::new(vec![vec![], vec![0], vec![1]], 0);
        let p = LessonProgress::new(fixed_now());
        assert_eq!(
            navigate(&p, &outline, 2, fixed_now()).unwrap_err(),
            ProgressError::StageLocked { index: 2 }
        );
        assert_eq!(
            navigate(&p, &outline, 3, fixed_now()).unwrap_err(),
            ProgressError::StageOutOfRange { index: 3, count: 3 }
        );
    }

    #[test]
    fn navigation_never_completes_a_stage() {
        let outline = LessonOutline::ungated(3, 0);
        let p = navigate(&LessonProgress::new(fixed_now()), &outline, 2, fixed_now()).unwrap();
        assert_eq!(p.current_stage_index(), 2);
        assert!(p.stage_results().is_empty());
        assert!(!p.is_completed());
    }

    #[test]
    fn completion_requires_every_stage_and_min_score() {
        let outline = LessonOutline::ungated(2, 70);
        let now = fixed_now();
        let p = LessonProgress::new(now);
        let p = apply(&p, &outline, completed(0, 10, 90), now).unwrap();
        assert!(!p.is_completed());

        let p = apply(&p, &outline, completed(1, 10, 50), now).unwrap();
        assert!(!p.is_completed());

        let later = now + Duration::minutes(5);
        let p = apply(&p, &outline, completed(1, 10, 75), later).unwrap();
        assert!(p.is_completed());
        assert_eq!(p.completed_at(), Some(later));

        // still complete: first completion time is kept
        let p = apply(&p, &outline, completed(0, 12, 95), later + Duration::minutes(1)).unwrap();
        assert_eq!(p.completed_at(), Some(later));

        // dropping below the pass mark clears it
        let p = apply(&p, &outline, completed(0, 12, 10), later).unwrap();
        assert!(!p.is_completed());
        assert!(p.completed_at().is_none());
    }

    #[test]
    fn empty_lesson_is_never_complete() {
        assert!(!compute_completion(&LessonProgress::new(fixed_now()), 0, 0));
    }

    #[test]
    fn completing_out_of_range_stage_is_rejected() {
        let outline = LessonOutline::ungated(2, 0);
        let err = apply(&LessonProgress::new(fixed_now()), &outline, completed(5, 1, 1), fixed_now())
            .unwrap_err();
        assert!(matches!(err, ProgressError::StageOutOfRange { index: 5, .. }));
    }

    #[test]
    fn completing_locked_stage_is_rejected() {
        let outline = LessonOutline::new(vec![vec![], vec![0], vec![1]], 0);
        let now = fixed_now();
        let p = LessonProgress::new(now);
        assert_eq!(
            apply(&p, &outline, completed(2, 10, 100), now).unwrap_err(),
            ProgressError::StageLocked { index: 2 }
        );

        let p = apply(&p, &outline, completed(0, 10, 100), now).unwrap();
        assert_eq!(
            apply(&p, &outline, completed(2, 10, 100), now).unwrap_err(),
            ProgressError::StageLocked { index: 2 }
        );
        let p = apply(&p, &outline, completed(1, 10, 100), now).unwrap();
        let p = apply(&p, &outline, completed(2, 10, 100), now).unwrap();
        assert!(p.is_completed());

        // re-attempting a completed stage is still allowed
        let p = apply(&p, &outline, completed(0, 4, 100), now).unwrap();
        assert_eq!(p.result_for(0).unwrap().points_earned, 4);
        assert_eq!(p.total_points(), 24);
    }

    #[test]
    fn bookmark_toggles_and_refreshes_access() {
        let later = fixed_now() + Duration::hours(1);
        let p = toggle_bookmark(&LessonProgress::new(fixed_now()), later);
        assert!(p.is_bookmarked());
        assert_eq!(p.last_accessed_at(), later);
        assert!(!toggle_bookmark(&p, later).is_bookmarked());
    }

    #[test]
    fn restart_resets_everything() {
        let outline = LessonOutline::ungated(1, 0);
        let now = fixed_now();
        let p = apply(&LessonProgress::new(now), &outline, completed(0, 10, 100), now).unwrap();
        let p = apply(&p, &outline, ProgressEvent::BookmarkToggled, now).unwrap();
        let later = now + Duration::days(1);
        let p = apply(&p, &outline, ProgressEvent::Restarted, later).unwrap();
        assert_eq!(p, LessonProgress::new(later));
    }

    proptest! {
        #[test]
        fn repeated_identical_result_keeps_totals(
            index in 0usize..14,
            points in 0u32..1_000,
            time in 0u64..10_000,
        ) {
            let once = record_stage_result(&LessonProgress::new(fixed_now()), index, result(points, time, 50));
            let twice = record_stage_result(&once, index, result(points, time, 50));
            prop_assert_eq!(once.total_points(), twice.total_points());
            prop_assert_eq!(once.total_time_spent(), twice.total_time_spent());
        }

        #[test]
        fn totals_always_equal_sums(
            records in prop::collection::vec((0usize..6, 0u32..500, 0u64..500), 0..40)
        ) {
            let mut p = LessonProgress::new(fixed_now());
            for (index, points, time) in records {
                p = record_stage_result(&p, index, result(points, time, 0));
            }
            let points: u64 = p.stage_results().values().map(|r| u64::from(r.points_earned)).sum();
            let time: u64 = p.stage_results().values().map(|r| r.time_spent_seconds).sum();
            prop_assert_eq!(p.total_points(), points);
            prop_assert_eq!(p.total_time_spent(), time);
        }

        #[test]
        fn incomplete_while_results_missing(
            total in 1usize..20,
            recorded in prop::collection::btree_set(0usize..20, 0..20),
        ) {
            let mut p = LessonProgress::new(fixed_now());
            for index in &recorded {
                p = record_stage_result(&p, *index, result(1, 1, 100));
            }
            let in_range = recorded.iter().filter(|i| **i < total).count();
            if in_range < total {
                prop_assert!(!compute_completion(&p, total, 0));
            }
        }
    }
}
