//! REST Backend
//!
//! Talks to the managed backend over HTTP: PostgREST under `/rest/v1` for
//! tables and the auth service under `/auth/v1` for token checks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{IdentityProvider, LearningStore};
use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult, QueryError};
use crate::models::{AuthUser, CourseProgress, Quiz};

/// Media type asking PostgREST for a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

const COURSE_SELECT: &str = "*,category:categories(*),lessons(*)";
const COURSE_DETAIL_SELECT: &str = "*,category:categories(*),lessons(*,quiz:quizzes(*))";
const NEWS_SELECT: &str = "*,author:users(id,name,avatar_url),\
comments(*,author:users(id,name,avatar_url),replies(*,author:users(id,name,avatar_url)))";
const PROGRESS_SELECT: &str = "*,course:courses(*),lessons:lesson_progress(*)";
const CERTIFICATE_SELECT: &str = "*,course:courses(id,title,thumbnail,instructor)";
const CERTIFICATE_DETAIL_SELECT: &str = "*,course:courses(*),user:users(id,name,email)";

// == Rest Backend ==
/// HTTP client for the managed backend.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    /// Builds the client from configuration.
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder, bearer: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
    }

    /// GET on a table; `bearer` is the anon key or a learner's access token.
    fn select(&self, table: &str, query: &[(&str, String)], bearer: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.table(table)), bearer)
            .query(query)
    }

    /// Fetches every row matching `query` as the anonymous role.
    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Vec<T>> {
        self.fetch_rows_as(table, query, &self.api_key).await
    }

    async fn fetch_rows_as<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        bearer: &str,
    ) -> BackendResult<Vec<T>> {
        debug!("Selecting rows from {}", table);
        let response = check(self.select(table, query, bearer).send().await?).await?;
        decode(response).await
    }

    /// Fetches exactly one row as the anonymous role; zero rows is `Ok(None)`.
    async fn fetch_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> BackendResult<Option<T>> {
        self.fetch_single_as(table, query, &self.api_key).await
    }

    /// Several matching rows stay an error.
    async fn fetch_single_as<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        bearer: &str,
    ) -> BackendResult<Option<T>> {
        debug!("Selecting single row from {}", table);
        let request = self
            .select(table, query, bearer)
            .header(header::ACCEPT, SINGLE_OBJECT);

        match check(request.send().await?).await {
            Ok(response) => decode(response).await.map(Some),
            Err(err) if err.is_empty_result() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Turns a non-success response into a `QueryError`.
async fn check(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let mut err = serde_json::from_str::<QueryError>(&text).unwrap_or_else(|_| {
        QueryError::new(if text.is_empty() {
            status.to_string()
        } else {
            text.clone()
        })
    });
    if err.message.is_empty() {
        err.message = status.to_string();
    }
    err.status = Some(status.as_u16());
    Err(BackendError::Query(err))
}

async fn decode<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl IdentityProvider for RestBackend {
    async fn verify(&self, token: &str) -> BackendResult<AuthUser> {
        let request = self.authorized(
            self.client.get(format!("{}/auth/v1/user", self.base_url)),
            token,
        );
        let response = check(request.send().await?).await?;
        decode(response).await
    }
}

#[async_trait]
impl LearningStore for RestBackend {
    async fn list_courses(&self) -> BackendResult<Vec<Value>> {
        self.fetch_rows(
            "courses",
            &[
                ("select", COURSE_SELECT.to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn featured_courses(&self) -> BackendResult<Vec<Value>> {
        self.fetch_rows(
            "courses",
            &[
                ("select", COURSE_SELECT.to_string()),
                ("is_featured", eq("true")),
                ("order", "rating.desc".to_string()),
            ],
        )
        .await
    }

    async fn course_by_id(&self, id: &str) -> BackendResult<Option<Value>> {
        self.fetch_single(
            "courses",
            &[("select", COURSE_DETAIL_SELECT.to_string()), ("id", eq(id))],
        )
        .await
    }

    async fn list_news(&self, limit: Option<usize>) -> BackendResult<Vec<Value>> {
        let mut query = vec![
            ("select", NEWS_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.fetch_rows("news", &query).await
    }

    async fn list_categories(&self) -> BackendResult<Vec<Value>> {
        self.fetch_rows(
            "categories",
            &[
                ("select", "*".to_string()),
                ("is_active", eq("true")),
                ("order", "name".to_string()),
            ],
        )
        .await
    }

    async fn quiz_by_id(&self, id: &str) -> BackendResult<Option<Quiz>> {
        self.fetch_single("quizzes", &[("select", "*".to_string()), ("id", eq(id))])
            .await
    }

    async fn quiz_by_lesson(&self, lesson_id: &str) -> BackendResult<Option<Quiz>> {
        self.fetch_single(
            "quizzes",
            &[("select", "*".to_string()), ("lesson_id", eq(lesson_id))],
        )
        .await
    }

    async fn lesson_course_id(&self, lesson_id: &str) -> BackendResult<Option<String>> {
        #[derive(Deserialize)]
        struct LessonCourse {
            course_id: String,
        }

        let row: Option<LessonCourse> = self
            .fetch_single(
                "lessons",
                &[("select", "course_id".to_string()), ("id", eq(lesson_id))],
            )
            .await?;
        Ok(row.map(|r| r.course_id))
    }

    async fn upsert_progress(&self, token: &str, progress: &CourseProgress) -> BackendResult<()> {
        debug!(
            "Upserting progress for user {} on course {}",
            progress.user_id, progress.course_id
        );
        let request = self
            .authorized(self.client.post(self.table("course_progress")), token)
            .query(&[("on_conflict", "user_id,course_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(progress);

        check(request.send().await?).await?;
        Ok(())
    }

    async fn progress_for_user(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>> {
        self.fetch_rows_as(
            "course_progress",
            &[
                ("select", PROGRESS_SELECT.to_string()),
                ("user_id", eq(user_id)),
            ],
            token,
        )
        .await
    }

    async fn user_certificates(&self, token: &str, user_id: &str) -> BackendResult<Vec<Value>> {
        self.fetch_rows_as(
            "certificates",
            &[
                ("select", CERTIFICATE_SELECT.to_string()),
                ("user_id", eq(user_id)),
                ("order", "issued_at.desc".to_string()),
            ],
            token,
        )
        .await
    }

    async fn certificate_by_id(&self, token: &str, id: &str) -> BackendResult<Option<Value>> {
        self.fetch_single_as(
            "certificates",
            &[
                ("select", CERTIFICATE_DETAIL_SELECT.to_string()),
                ("id", eq(id)),
            ],
            token,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(url: &str) -> RestBackend {
        RestBackend::new(&BackendConfig {
            url: url.to_string(),
            api_key: "anon".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let backend = backend("https://example.supabase.co/");
        assert_eq!(
            backend.table("courses"),
            "https://example.supabase.co/rest/v1/courses"
        );
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq("abc"), "eq.abc");
    }
}
