//! In-Memory Backend
//!
//! An in-process stand-in for the managed backend, used by tests and local
//! runs. Applies the same filters and orderings as the REST queries, and
//! scopes a learner's own rows to the user behind the access token the way
//! the backend's row-level policies do.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{IdentityProvider, LearningStore};
use crate::error::{BackendError, BackendResult, QueryError};
use crate::models::{AuthUser, CourseProgress, Quiz};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, AuthUser>,
    courses: Vec<Value>,
    categories: Vec<Value>,
    news: Vec<Value>,
    quizzes: Vec<Quiz>,
    lessons: HashMap<String, String>,
    progress: Vec<CourseProgress>,
    certificates: Vec<Value>,
    /// Operation name -> error returned instead of running it
    failures: HashMap<String, QueryError>,
}

// == In-Memory Backend ==
/// Shared in-memory tables. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as a credential for `user`.
    pub async fn add_user(&self, token: impl Into<String>, user: AuthUser) {
        self.tables.write().await.users.insert(token.into(), user);
    }

    pub async fn add_course(&self, course: Value) {
        self.tables.write().await.courses.push(course);
    }

    pub async fn add_category(&self, category: Value) {
        self.tables.write().await.categories.push(category);
    }

    pub async fn add_news(&self, news: Value) {
        self.tables.write().await.news.push(news);
    }

    pub async fn add_quiz(&self, quiz: Quiz) {
        self.tables.write().await.quizzes.push(quiz);
    }

    pub async fn add_certificate(&self, certificate: Value) {
        self.tables.write().await.certificates.push(certificate);
    }

    /// Records that `lesson_id` belongs to `course_id`.
    pub async fn add_lesson(&self, lesson_id: impl Into<String>, course_id: impl Into<String>) {
        self.tables
            .write()
            .await
            .lessons
            .insert(lesson_id.into(), course_id.into());
    }

    /// Makes the named store operation (e.g. `"list_courses"`) fail with `err`.
    pub async fn fail_with(&self, operation: &str, err: QueryError) {
        self.tables
            .write()
            .await
            .failures
            .insert(operation.to_string(), err);
    }

    /// Snapshot of the stored progress rows.
    pub async fn progress(&self) -> Vec<CourseProgress> {
        self.tables.read().await.progress.clone()
    }

    fn check(tables: &Tables, operation: &str) -> BackendResult<()> {
        match tables.failures.get(operation) {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    /// The user a row-scoped operation runs as.
    fn session<'a>(tables: &'a Tables, token: &str) -> BackendResult<&'a AuthUser> {
        tables.users.get(token).ok_or_else(|| {
            BackendError::Query(QueryError {
                status: Some(401),
                ..QueryError::new("JWT expired").with_code("PGRST301")
            })
        })
    }
}

fn owned_by(row: &Value, user_id: &str) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(user_id)
}

fn field_is_true(row: &Value, field: &str) -> bool {
    row.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// Orders two rows by a field, nulls last; numbers and strings compare naturally.
fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn sorted_desc(mut rows: Vec<Value>, field: &str) -> Vec<Value> {
    rows.sort_by(|a, b| compare_field(b, a, field));
    rows
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    async fn verify(&self, token: &str) -> BackendResult<AuthUser> {
        let tables = self.tables.read().await;
        Self::check(&tables, "verify")?;
        tables.users.get(token).cloned().ok_or_else(|| {
            BackendError::Query(
                QueryError::new("invalid JWT: unable to parse or verify signature")
                    .with_code("bad_jwt"),
            )
        })
    }
}

#[async_trait]
impl LearningStore for InMemoryBackend {
    async fn list_courses(&self) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "list_courses")?;
        Ok(sorted_desc(tables.courses.clone(), "created_at"))
    }

    async fn featured_courses(&self) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "featured_courses")?;
        let featured = tables
            .courses
            .iter()
            .filter(|c| field_is_true(c, "is_featured"))
            .cloned()
            .collect();
        Ok(sorted_desc(featured, "rating"))
    }

    async fn course_by_id(&self, id: &str) -> BackendResult<Option<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "course_by_id")?;
        Ok(tables
            .courses
            .iter()
            .find(|c| c.get("id").and_then(Value::as_str) == Some(id))
            .cloned())
    }

    async fn list_news(&self, limit: Option<usize>) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "list_news")?;
        let mut news = sorted_desc(tables.news.clone(), "created_at");
        if let Some(limit) = limit {
            news.truncate(limit);
        }
        Ok(news)
    }

    async fn list_categories(&self) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "list_categories")?;
        let mut active: Vec<Value> = tables
            .categories
            .iter()
            .filter(|c| field_is_true(c, "is_active"))
            .cloned()
            .collect();
        active.sort_by(|a, b| compare_field(a, b, "name"));
        Ok(active)
    }

    async fn quiz_by_id(&self, id: &str) -> BackendResult<Option<Quiz>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "quiz_by_id")?;
        Ok(tables.quizzes.iter().find(|q| q.id == id).cloned())
    }

    async fn quiz_by_lesson(&self, lesson_id: &str) -> BackendResult<Option<Quiz>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "quiz_by_lesson")?;
        Ok(tables
            .quizzes
            .iter()
            .find(|q| q.lesson_id.as_deref() == Some(lesson_id))
            .cloned())
    }

    async fn lesson_course_id(&self, lesson_id: &str) -> BackendResult<Option<String>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "lesson_course_id")?;
        Ok(tables.lessons.get(lesson_id).cloned())
    }

    async fn upsert_progress(&self, token: &str, progress: &CourseProgress) -> BackendResult<()> {
        let mut tables = self.tables.write().await;
        Self::check(&tables, "upsert_progress")?;
        if Self::session(&tables, token)?.id != progress.user_id {
            return Err(BackendError::Query(QueryError {
                status: Some(403),
                ..QueryError::new(
                    "new row violates row-level security policy for table \"course_progress\"",
                )
                .with_code("42501")
            }));
        }
        let existing = tables
            .progress
            .iter_mut()
            .find(|p| p.user_id == progress.user_id && p.course_id == progress.course_id);
        match existing {
            Some(row) => *row = progress.clone(),
            None => tables.progress.push(progress.clone()),
        }
        Ok(())
    }

    async fn progress_for_user(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "progress_for_user")?;
        let caller = &Self::session(&tables, token)?.id;
        tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && &p.user_id == caller)
            .map(|p| {
                serde_json::to_value(p)
                    .map_err(|e| BackendError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn user_certificates(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "user_certificates")?;
        let caller = &Self::session(&tables, token)?.id;
        let owned = tables
            .certificates
            .iter()
            .filter(|c| owned_by(c, user_id) && owned_by(c, caller))
            .cloned()
            .collect();
        Ok(sorted_desc(owned, "issued_at"))
    }

    async fn certificate_by_id(&self, token: &str, id: &str) -> BackendResult<Option<Value>> {
        let tables = self.tables.read().await;
        Self::check(&tables, "certificate_by_id")?;
        let caller = &Self::session(&tables, token)?.id;
        Ok(tables
            .certificates
            .iter()
            .find(|c| c.get("id").and_then(Value::as_str) == Some(id) && owned_by(c, caller))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_verify_known_and_unknown_token() {
        let backend = InMemoryBackend::new();
        backend.add_user("good", AuthUser::new("u1")).await;

        assert_eq!(backend.verify("good").await.unwrap().id, "u1");
        assert!(backend.verify("bad").await.is_err());
    }

    #[tokio::test]
    async fn test_featured_sorted_by_rating() {
        let backend = InMemoryBackend::new();
        backend
            .add_course(json!({ "id": "a", "is_featured": true, "rating": 4.1 }))
            .await;
        backend
            .add_course(json!({ "id": "b", "is_featured": false, "rating": 5.0 }))
            .await;
        backend
            .add_course(json!({ "id": "c", "is_featured": true, "rating": 4.9 }))
            .await;

        let featured = backend.featured_courses().await.unwrap();
        let ids: Vec<_> = featured.iter().map(|c| c["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_categories_active_and_by_name() {
        let backend = InMemoryBackend::new();
        backend
            .add_category(json!({ "name": "Rust", "is_active": true }))
            .await;
        backend
            .add_category(json!({ "name": "Go", "is_active": false }))
            .await;
        backend
            .add_category(json!({ "name": "Data", "is_active": true }))
            .await;

        let names: Vec<_> = backend
            .list_categories()
            .await
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Data", "Rust"]);
    }

    #[tokio::test]
    async fn test_news_limit() {
        let backend = InMemoryBackend::new();
        for day in 1..=3 {
            backend
                .add_news(json!({ "id": day, "created_at": format!("2024-01-0{}", day) }))
                .await;
        }

        let news = backend.list_news(Some(2)).await.unwrap();
        assert_eq!(news.len(), 2);
        assert_eq!(news[0]["id"], 3);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let backend = InMemoryBackend::new();
        backend.add_user("t1", AuthUser::new("u1")).await;
        backend
            .upsert_progress("t1", &CourseProgress::completed("u1", "c1", 70.0))
            .await
            .unwrap();
        backend
            .upsert_progress("t1", &CourseProgress::completed("u1", "c1", 90.0))
            .await
            .unwrap();

        let rows = backend.progress().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].grade, 90.0);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = InMemoryBackend::new();
        backend
            .fail_with("list_courses", QueryError::new("boom"))
            .await;
        assert!(backend.list_courses().await.is_err());
        assert!(backend.list_categories().await.is_ok());
    }

    #[tokio::test]
    async fn test_rows_scoped_to_token_owner() {
        let backend = InMemoryBackend::new();
        backend.add_user("t1", AuthUser::new("u1")).await;
        backend.add_user("t2", AuthUser::new("u2")).await;

        let err = backend
            .upsert_progress("t2", &CourseProgress::completed("u1", "c1", 80.0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("row-level security"));
        assert!(backend.progress().await.is_empty());

        backend
            .upsert_progress("t1", &CourseProgress::completed("u1", "c1", 80.0))
            .await
            .unwrap();
        assert_eq!(backend.progress_for_user("t1", "u1").await.unwrap().len(), 1);
        assert!(backend.progress_for_user("t2", "u1").await.unwrap().is_empty());
        assert!(backend.progress_for_user("unknown", "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_certificates_newest_first_and_private() {
        let backend = InMemoryBackend::new();
        backend.add_user("t1", AuthUser::new("u1")).await;
        backend.add_user("t2", AuthUser::new("u2")).await;
        backend
            .add_certificate(json!({ "id": "old", "user_id": "u1", "issued_at": "2024-01-01" }))
            .await;
        backend
            .add_certificate(json!({ "id": "new", "user_id": "u1", "issued_at": "2024-06-01" }))
            .await;
        backend
            .add_certificate(json!({ "id": "theirs", "user_id": "u2", "issued_at": "2024-03-01" }))
            .await;

        let ids: Vec<_> = backend
            .user_certificates("t1", "u1")
            .await
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["new", "old"]);

        assert!(backend.certificate_by_id("t1", "new").await.unwrap().is_some());
        assert!(backend.certificate_by_id("t1", "theirs").await.unwrap().is_none());
    }
}
