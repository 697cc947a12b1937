//! API Handlers
//!
//! One async function per registered route. Handlers return `Err` for any
//! failure and leave envelope shaping to the dispatcher.

use serde::Serialize;
use serde_json::Value;

use super::router::{HandlerContext, HandlerOutput, HandlerResult};
use crate::error::{ApiError, BackendResult, Result};
use crate::grading::{grade, record_completion};
use crate::models::SubmitQuizRequest;

/// A "no rows" failure on a list query is an empty list, not an error.
fn rows_or_empty(result: BackendResult<Vec<Value>>) -> Result<Vec<Value>> {
    match result {
        Ok(rows) => Ok(rows),
        Err(err) if err.is_no_rows() => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

/// Handler for GET courses
pub async fn list_courses(ctx: HandlerContext) -> HandlerResult {
    HandlerOutput::json(rows_or_empty(ctx.store.list_courses().await)?)
}

/// Handler for GET courses/featured
pub async fn featured_courses(ctx: HandlerContext) -> HandlerResult {
    HandlerOutput::json(rows_or_empty(ctx.store.featured_courses().await)?)
}

/// Handler for GET courses/:id
pub async fn get_course(ctx: HandlerContext) -> HandlerResult {
    let id = ctx.params.require("id")?;
    let course = ctx
        .store
        .course_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    HandlerOutput::json(course)
}

/// Handler for GET news
///
/// Accepts an optional positive `limit` query parameter.
pub async fn list_news(ctx: HandlerContext) -> HandlerResult {
    let limit = match ctx.request.query_param("limit") {
        None => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                return Err(ApiError::bad_request(
                    format!("Invalid limit: {}", raw),
                    "INVALID_QUERY",
                ))
            }
        },
    };
    HandlerOutput::json(rows_or_empty(ctx.store.list_news(limit).await)?)
}

/// Handler for GET categories
pub async fn list_categories(ctx: HandlerContext) -> HandlerResult {
    HandlerOutput::json(rows_or_empty(ctx.store.list_categories().await)?)
}

#[derive(Serialize)]
struct Catalog {
    categories: Vec<Value>,
    courses: Vec<Value>,
}

/// Handler for GET catalog
///
/// Fetches categories and courses concurrently; either failure fails both.
pub async fn catalog(ctx: HandlerContext) -> HandlerResult {
    let (categories, courses) = tokio::try_join!(
        async { rows_or_empty(ctx.store.list_categories().await) },
        async { rows_or_empty(ctx.store.list_courses().await) },
    )?;
    HandlerOutput::json(Catalog {
        categories,
        courses,
    })
}

/// Handler for GET lessons/:id/quiz
pub async fn lesson_quiz(ctx: HandlerContext) -> HandlerResult {
    let lesson_id = ctx.params.require("id")?;
    let quiz = ctx
        .store
        .quiz_by_lesson(lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Quiz not found"))?;
    HandlerOutput::json(quiz)
}

/// Handler for POST quizzes/:id/submit
///
/// Grades the submission and, on a pass, records course completion.
pub async fn submit_quiz(ctx: HandlerContext) -> HandlerResult {
    let quiz_id = ctx.params.require("id")?;
    let body: SubmitQuizRequest = ctx.request.json()?;

    let quiz = ctx
        .store
        .quiz_by_id(quiz_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Quiz not found"))?;

    let result = grade(&quiz, &body.answers);
    if result.passed {
        record_completion(ctx.store.as_ref(), &ctx.user, &ctx.token, &quiz, &result).await?;
    }
    HandlerOutput::json(result)
}

/// Handler for GET progress
pub async fn my_progress(ctx: HandlerContext) -> HandlerResult {
    HandlerOutput::json(rows_or_empty(
        ctx.store.progress_for_user(&ctx.token, &ctx.user.id).await,
    )?)
}

/// Handler for GET certificates
pub async fn my_certificates(ctx: HandlerContext) -> HandlerResult {
    HandlerOutput::json(rows_or_empty(
        ctx.store.user_certificates(&ctx.token, &ctx.user.id).await,
    )?)
}

/// Handler for GET certificates/:id
pub async fn get_certificate(ctx: HandlerContext) -> HandlerResult {
    let id = ctx.params.require("id")?;
    let certificate = ctx
        .store
        .certificate_by_id(&ctx.token, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Certificate not found"))?;
    HandlerOutput::json(certificate)
}
