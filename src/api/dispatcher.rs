//! Request Dispatcher
//!
//! Single entry point for every API request: preflight, authentication,
//! route lookup, handler invocation and envelope shaping. Never panics on a
//! bad request; every failure becomes an `{"error": ...}` response.

use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn, Level};

use super::router::{HandlerContext, HandlerOutput, RouteTable};
use crate::backend::{IdentityProvider, LearningStore};
use crate::config::{Config, CorsPolicy, DEFAULT_API_PREFIX};
use crate::error::{ApiError, BackendError, Result};
use crate::models::{ApiRequest, AuthUser, DataEnvelope};

/// Routes authenticated requests to registered handlers.
///
/// Holds only read-only state; one instance serves all requests.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn LearningStore>,
    prefix: String,
    cors: CorsPolicy,
}

impl Dispatcher {
    /// Creates a dispatcher with the default prefix and CORS policy.
    pub fn new(
        routes: RouteTable,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn LearningStore>,
    ) -> Self {
        Self {
            routes: Arc::new(routes),
            identity,
            store,
            prefix: DEFAULT_API_PREFIX.to_string(),
            cors: CorsPolicy::default(),
        }
    }

    /// Creates a dispatcher using the prefix and CORS policy from `config`.
    pub fn from_config(
        config: &Config,
        routes: RouteTable,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn LearningStore>,
    ) -> Self {
        Self::new(routes, identity, store)
            .with_prefix(&config.api_prefix)
            .with_cors(config.cors.clone())
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handles one request end to end.
    pub async fn handle(&self, request: ApiRequest) -> Response {
        let mut response = if request.method == Method::OPTIONS {
            StatusCode::NO_CONTENT.into_response()
        } else {
            let method = request.method.clone();
            let path = request.path.clone();
            match self.dispatch(request).await {
                Ok(output) => (output.status, Json(DataEnvelope::new(output.data))).into_response(),
                Err(err) => {
                    log_failure(&method, &path, &err);
                    err.into_response()
                }
            }
        };

        self.cors.apply(response.headers_mut());
        response
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<HandlerOutput> {
        let token = request
            .bearer_token()
            .ok_or(ApiError::Unauthorized)?
            .to_string();
        let user = self.authenticate(&token).await?;

        let path = self.strip_prefix(&request.path);
        let found = self
            .routes
            .resolve(&request.method, path)
            .ok_or(ApiError::RouteNotFound)?;
        debug!(
            "{} {} matched {} for user {}",
            request.method, request.path, found.template, user.id
        );

        let ctx = HandlerContext {
            params: found.params,
            user,
            token,
            store: Arc::clone(&self.store),
            request,
        };
        found.handler.call(ctx).await
    }

    async fn authenticate(&self, token: &str) -> Result<AuthUser> {
        self.identity.verify(token).await.map_err(|err| {
            if rejection_level(&err) == Level::WARN {
                warn!("Identity provider unavailable: {}", err);
            } else {
                debug!("Token rejected by identity provider: {}", err);
            }
            ApiError::InvalidToken
        })
    }

    fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str())
            .or_else(|| (path == self.prefix.trim_end_matches('/')).then_some(""))
            .unwrap_or(path)
    }
}

/// An outage is worth a warning; a bad token is routine.
fn rejection_level(err: &BackendError) -> Level {
    if err.is_unavailable() {
        Level::WARN
    } else {
        Level::DEBUG
    }
}

fn log_failure(method: &Method, path: &str, err: &ApiError) {
    let status = err.status();
    if status.is_server_error() {
        error!("API error on {} {}: {} ({})", method, path, err, status);
    } else {
        warn!("API error on {} {}: {} ({})", method, path, err, status);
    }
}
