//! API Routes
//!
//! Registers the gateway's route table and mounts the dispatcher on an
//! Axum router.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    response::Response,
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use super::dispatcher::Dispatcher;
use super::handlers;
use super::router::{RouteError, RouteTable};
use crate::models::{ApiRequest, HealthResponse};

/// Application state shared across all requests.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Builds the gateway's route table.
///
/// # Routes
/// - `GET courses` - All courses
/// - `GET courses/featured` - Featured courses
/// - `GET courses/:id` - One course with lessons
/// - `GET news` - News, optional `limit`
/// - `GET categories` - Active categories
/// - `GET catalog` - Categories and courses together
/// - `GET lessons/:id/quiz` - Quiz of a lesson
/// - `POST quizzes/:id/submit` - Grade a submission
/// - `GET progress` - The caller's course progress
/// - `GET certificates` - The caller's certificates
/// - `GET certificates/:id` - One certificate
pub fn api_routes() -> Result<RouteTable, RouteError> {
    let mut routes = RouteTable::new();
    routes.add(Method::GET, "courses", handlers::list_courses)?;
    // Literal before parameter: "featured" is not a course id
    routes.add(Method::GET, "courses/featured", handlers::featured_courses)?;
    routes.add(Method::GET, "courses/:id", handlers::get_course)?;
    routes.add(Method::GET, "news", handlers::list_news)?;
    routes.add(Method::GET, "categories", handlers::list_categories)?;
    routes.add(Method::GET, "catalog", handlers::catalog)?;
    routes.add(Method::GET, "lessons/:id/quiz", handlers::lesson_quiz)?;
    routes.add(Method::POST, "quizzes/:id/submit", handlers::submit_quiz)?;
    routes.add(Method::GET, "progress", handlers::my_progress)?;
    routes.add(Method::GET, "certificates", handlers::my_certificates)?;
    routes.add(Method::GET, "certificates/:id", handlers::get_certificate)?;
    Ok(routes)
}

/// Creates the Axum router.
///
/// # Endpoints
/// - `GET /health` - Health check, no authentication
/// - everything else - handed to the [`Dispatcher`]
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(dispatch_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Converts the Axum request into an [`ApiRequest`] and dispatches it.
async fn dispatch_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map(|Query(q)| q)
        .unwrap_or_default();

    let request = ApiRequest {
        method,
        path: uri.path().to_string(),
        headers,
        query,
        body: (!body.is_empty()).then_some(body),
    };
    state.dispatcher.handle(request).await
}
