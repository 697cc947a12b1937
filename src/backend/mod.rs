//! Backend Module
//!
//! Seams to the managed backend: identity verification and the learning
//! data tables. Both are injected into the dispatcher, never held globally.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendResult;
use crate::models::{AuthUser, CourseProgress, Quiz};

pub use memory::InMemoryBackend;
pub use rest::RestBackend;

/// Resolves bearer tokens to users.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the user the token belongs to, or an error if it is rejected.
    async fn verify(&self, token: &str) -> BackendResult<AuthUser>;
}

/// Read and write access to the learning tables.
///
/// Rows the gateway only passes through are plain JSON values; single-row
/// reads return `Ok(None)` when nothing matches. Operations on a learner's
/// own rows take the caller's access token so the backend applies its
/// row-level policies to that learner rather than the anonymous role.
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// All courses with category and lessons, newest first.
    async fn list_courses(&self) -> BackendResult<Vec<Value>>;

    /// Featured courses, highest rating first.
    async fn featured_courses(&self) -> BackendResult<Vec<Value>>;

    /// One course with category, lessons and their quizzes.
    async fn course_by_id(&self, id: &str) -> BackendResult<Option<Value>>;

    /// News with authors and comments, newest first.
    async fn list_news(&self, limit: Option<usize>) -> BackendResult<Vec<Value>>;

    /// Active categories ordered by name.
    async fn list_categories(&self) -> BackendResult<Vec<Value>>;

    async fn quiz_by_id(&self, id: &str) -> BackendResult<Option<Quiz>>;

    async fn quiz_by_lesson(&self, lesson_id: &str) -> BackendResult<Option<Quiz>>;

    /// The course a lesson belongs to.
    async fn lesson_course_id(&self, lesson_id: &str) -> BackendResult<Option<String>>;

    /// Inserts or replaces the (user, course) progress row.
    async fn upsert_progress(&self, token: &str, progress: &CourseProgress) -> BackendResult<()>;

    /// Progress rows for one user.
    async fn progress_for_user(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>>;

    /// Certificates of one user with their course, most recently issued first.
    async fn user_certificates(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>>;

    /// One certificate with its course and holder.
    async fn certificate_by_id(&self, token: &str, id: &str) -> BackendResult<Option<Value>>;
}
