//! Error types for the gateway
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{ErrorBody, ErrorEnvelope};

/// PostgREST error code for "the result contains 0 rows".
pub const NO_ROWS_CODE: &str = "PGRST116";

// == Query Error ==
/// Error body returned by the backend's REST layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub hint: Option<Value>,
    /// HTTP status the backend answered with, when known
    #[serde(skip)]
    pub status: Option<u16>,
}

impl QueryError {
    /// Creates a QueryError with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
            hint: None,
            status: None,
        }
    }

    /// The "no rows" condition raised by single-row reads.
    pub fn no_rows() -> Self {
        Self {
            code: Some(NO_ROWS_CODE.to_string()),
            message: "JSON object requested, multiple (or no) rows returned".to_string(),
            details: Some(Value::String("The result contains 0 rows".to_string())),
            hint: None,
            status: Some(406),
        }
    }

    /// Sets the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS_CODE)
    }

    /// True when a single-row read matched nothing.
    ///
    /// The backend raises the same code when several rows match; only the
    /// details tell the two apart.
    pub fn is_empty_result(&self) -> bool {
        self.is_no_rows()
            && self
                .details
                .as_ref()
                .and_then(Value::as_str)
                .map_or(false, |details| details.contains(" 0 rows"))
    }
}

// == Backend Error Enum ==
/// Failures talking to the managed backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend rejected the query
    #[error("{}", .0.message)]
    Query(QueryError),

    /// The request never produced a usable response
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// True when the error is the backend's "no rows" condition.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, BackendError::Query(q) if q.is_no_rows())
    }

    /// True when a single-row read matched nothing.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, BackendError::Query(q) if q.is_empty_result())
    }

    /// True when the backend could not be reached or answered with a
    /// server-side failure, as opposed to rejecting the request.
    pub fn is_unavailable(&self) -> bool {
        match self {
            BackendError::Transport(_) | BackendError::Decode(_) => true,
            BackendError::Query(q) => q.status.map_or(false, |status| status >= 500),
        }
    }
}

impl From<QueryError> for BackendError {
    fn from(err: QueryError) -> Self {
        BackendError::Query(err)
    }
}

// == Api Error Enum ==
/// Every failure the dispatcher can turn into a response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No bearer credential on the request
    #[error("Unauthorized")]
    Unauthorized,

    /// The identity provider rejected the credential
    #[error("Invalid token")]
    InvalidToken,

    /// No registered route for the method and path
    #[error("Route not found")]
    RouteNotFound,

    /// A handler failed
    #[error("{message}")]
    Handler {
        status: StatusCode,
        message: String,
        code: Option<String>,
        details: Option<Value>,
    },
}

impl ApiError {
    /// Creates a handler failure with an explicit status.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Handler {
            status,
            message: message.into(),
            code: None,
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>, code: &str) -> Self {
        ApiError::Handler {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            code: Some(code.to_string()),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::Handler { status, .. } => *status,
        }
    }

    /// Client-facing error body.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            ApiError::Handler {
                message,
                code,
                details,
                ..
            } => ErrorBody {
                message: message.clone(),
                code: code.clone(),
                details: details.clone(),
            },
            other => ErrorBody::new(other.to_string()),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Query(q) => ApiError::Handler {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: if q.message.is_empty() {
                    "Internal server error".to_string()
                } else {
                    q.message
                },
                code: q.code,
                details: q.details,
            },
            other => ApiError::internal(other.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope { error: self.to_body() });
        (self.status(), body).into_response()
    }
}

// == Result Type Aliases ==
/// Result type for handler and dispatcher code.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
