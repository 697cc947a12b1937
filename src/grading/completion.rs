//! Course Completion
//!
//! Writes the "completed" progress row for a passed quiz. Grading itself never
//! calls this; the caller decides on a passing result.

use tracing::info;

use crate::backend::LearningStore;
use crate::error::{ApiError, Result};
use crate::grading::GradeResult;
use crate::models::{AuthUser, CourseProgress, Quiz};

/// Marks the quiz's course as completed for `user`, writing as the holder of
/// `token`.
///
/// Fails if the quiz has no lesson or the lesson has no course.
pub async fn record_completion(
    store: &dyn LearningStore,
    user: &AuthUser,
    token: &str,
    quiz: &Quiz,
    result: &GradeResult,
) -> Result<CourseProgress> {
    let lesson_id = quiz
        .lesson_id
        .as_deref()
        .ok_or_else(|| ApiError::internal("Quiz is not attached to a lesson"))?;

    let course_id = store
        .lesson_course_id(lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;

    let progress = CourseProgress::completed(&user.id, course_id, result.score);
    store.upsert_progress(token, &progress).await?;

    info!(
        "User {} completed course {} with grade {:.1}",
        user.id, progress.course_id, progress.grade
    );
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::error::QueryError;
    use crate::models::{ProgressStatus, Question};

    fn passed(score: f64) -> GradeResult {
        GradeResult {
            score,
            passed: true,
        }
    }

    #[tokio::test]
    async fn test_record_completion_writes_progress() {
        let store = InMemoryBackend::new();
        store.add_user("t1", AuthUser::new("u1")).await;
        store.add_lesson("lesson-1", "course-1").await;
        let quiz = Quiz::new("quiz-1", vec![Question::with_answer(0)], 70.0).for_lesson("lesson-1");

        let progress = record_completion(&store, &AuthUser::new("u1"), "t1", &quiz, &passed(100.0))
            .await
            .unwrap();

        assert_eq!(progress.course_id, "course-1");
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert!(progress.completed_at.is_some());
        assert_eq!(store.progress().await, vec![progress]);
    }

    #[tokio::test]
    async fn test_record_completion_unknown_lesson() {
        let store = InMemoryBackend::new();
        let quiz = Quiz::new("quiz-1", vec![], 70.0).for_lesson("missing");

        let err = record_completion(&store, &AuthUser::new("u1"), "t1", &quiz, &passed(100.0))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(store.progress().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_completion_detached_quiz() {
        let store = InMemoryBackend::new();
        let quiz = Quiz::new("quiz-1", vec![], 70.0);

        let result = record_completion(&store, &AuthUser::new("u1"), "t1", &quiz, &passed(100.0)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_record_completion_store_failure() {
        let store = InMemoryBackend::new();
        store.add_lesson("lesson-1", "course-1").await;
        store
            .fail_with("upsert_progress", QueryError::new("write denied"))
            .await;
        let quiz = Quiz::new("quiz-1", vec![], 70.0).for_lesson("lesson-1");

        let err = record_completion(&store, &AuthUser::new("u1"), "t1", &quiz, &passed(100.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "write denied");
    }

    #[tokio::test]
    async fn test_record_completion_writes_as_token_owner() {
        let store = InMemoryBackend::new();
        store.add_user("t1", AuthUser::new("u1")).await;
        store.add_user("t2", AuthUser::new("u2")).await;
        store.add_lesson("lesson-1", "course-1").await;
        let quiz = Quiz::new("quiz-1", vec![], 70.0).for_lesson("lesson-1");

        let err = record_completion(&store, &AuthUser::new("u1"), "t2", &quiz, &passed(100.0))
            .await
            .unwrap_err();
        assert_eq!(err.to_body().code.as_deref(), Some("42501"));
        assert!(store.progress().await.is_empty());
    }
}
