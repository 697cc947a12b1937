//! Route Table
//!
//! An ordered list of `(method, path template, handler)` entries. Templates are
//! slash-separated segments where `:name` captures one request segment. Lookup
//! tries entries in registration order, so `courses/featured` registered before
//! `courses/:id` wins for that literal path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::backend::LearningStore;
use crate::error::{ApiError, Result};
use crate::models::{ApiRequest, AuthUser};

/// Marks a parameter segment in a template.
const PARAM_MARKER: char = ':';

// == Handler Types ==
/// Successful handler outcome: a status and the `data` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutput {
    pub status: StatusCode,
    pub data: Value,
}

impl HandlerOutput {
    /// 200 with `data` serialized to JSON.
    pub fn json<T: Serialize>(data: T) -> Result<Self> {
        let data = serde_json::to_value(data)
            .map_err(|e| ApiError::internal(format!("Failed to serialize response: {}", e)))?;
        Ok(Self {
            status: StatusCode::OK,
            data,
        })
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

pub type HandlerResult = Result<HandlerOutput>;

/// Everything a handler gets for one request.
#[derive(Clone)]
pub struct HandlerContext {
    pub request: ApiRequest,
    pub params: PathParams,
    /// The caller, already verified by the dispatcher
    pub user: AuthUser,
    /// The caller's access token, for reads and writes of their own rows
    pub token: String,
    pub store: Arc<dyn LearningStore>,
}

/// A route handler. Implemented for any `async fn(HandlerContext) -> HandlerResult`.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, ctx: HandlerContext) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, ctx: HandlerContext) -> HandlerResult {
        (self)(ctx).await
    }
}

// == Path Params ==
/// Parameter name -> captured segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Like `get`, but a missing parameter is a handler failure.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| ApiError::internal(format!("Missing path parameter: {}", name)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// == Route Errors ==
/// Problems detected while building the table.
#[derive(Error, Debug, PartialEq)]
pub enum RouteError {
    #[error("Empty parameter name in template '{0}'")]
    EmptyParam(String),

    #[error("Parameter '{param}' appears twice in template '{template}'")]
    DuplicateParam { template: String, param: String },

    #[error("Route already registered: {method} {template}")]
    Duplicate { method: Method, template: String },
}

// == Path Pattern ==
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a template such as `lessons/:id/quiz`.
    pub fn parse(template: &str) -> std::result::Result<Self, RouteError> {
        let mut segments = Vec::new();
        for part in split_path(template) {
            match part.strip_prefix(PARAM_MARKER) {
                Some("") => return Err(RouteError::EmptyParam(template.to_string())),
                Some(name) => {
                    let taken = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name));
                    if taken {
                        return Err(RouteError::DuplicateParam {
                            template: template.to_string(),
                            param: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            template: segments_to_template(&segments),
            segments,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Binds parameters if `path` has the same number of segments and every
    /// literal segment is equal.
    pub fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), actual.to_string());
                }
            }
        }
        Some(PathParams(params))
    }

    /// True if both patterns accept exactly the same paths.
    fn same_shape(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }
}

fn segments_to_template(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Literal(lit) => lit.clone(),
            Segment::Param(name) => format!("{}{}", PARAM_MARKER, name),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits a path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

// == Route Table ==
struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn RouteHandler>,
}

/// The result of a successful lookup.
pub struct RouteMatch<'a> {
    pub handler: &'a dyn RouteHandler,
    pub params: PathParams,
    /// Template of the matched route, for logging
    pub template: &'a str,
}

/// Ordered route registry. Built once at startup, then shared read-only.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route.
    ///
    /// Rejects a second route with the same method and template shape
    /// (parameter names do not distinguish shapes).
    pub fn add<H>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
    ) -> std::result::Result<(), RouteError>
    where
        H: RouteHandler + 'static,
    {
        let pattern = PathPattern::parse(template)?;
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern.same_shape(&pattern))
        {
            return Err(RouteError::Duplicate {
                method,
                template: pattern.template,
            });
        }

        self.routes.push(Route {
            method,
            pattern,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Finds the first route matching `method` and the prefix-free `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments = split_path(path);
        self.routes
            .iter()
            .filter(|r| &r.method == method)
            .find_map(|r| {
                r.pattern.matches(&segments).map(|params| RouteMatch {
                    handler: r.handler.as_ref(),
                    params,
                    template: r.pattern.template(),
                })
            })
    }

    /// `METHOD template` for every route, in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.pattern.template()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
