//! Request DTOs for the gateway API
//!
//! Defines the parsed inbound request and the structure of request bodies.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, Result};

/// A transport-independent view of an inbound request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Full request path, prefix included
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// Creates a request with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Adds a header, ignoring values that are not valid header text.
    pub fn with_header(mut self, name: header::HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header(header::AUTHORIZATION, &format!("Bearer {}", token))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the bearer credential from the `Authorization` header.
    ///
    /// A missing header, a non-bearer scheme or an empty token all yield `None`.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))?
            .trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Deserializes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = self
            .body
            .as_ref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ApiError::bad_request("Request body is required", "INVALID_BODY"))?;
        serde_json::from_slice(bytes)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e), "INVALID_BODY"))
    }
}

/// Request body for POST quizzes/:id/submit
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitQuizRequest {
    /// Selected answer index per question, in question order
    pub answers: Vec<usize>,
}
