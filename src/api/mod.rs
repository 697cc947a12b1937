//! API Module
//!
//! The dispatcher, its route table and handlers, and the Axum glue.
//!
//! # Endpoints (under the API prefix, bearer token required)
//! - `GET courses`, `GET courses/featured`, `GET courses/:id`
//! - `GET news`, `GET categories`, `GET catalog`
//! - `GET lessons/:id/quiz`, `POST quizzes/:id/submit`, `GET progress`

pub mod dispatcher;
pub mod handlers;
pub mod router;
pub mod routes;

pub use dispatcher::Dispatcher;
pub use router::{HandlerContext, HandlerOutput, HandlerResult, RouteTable};
pub use routes::{api_routes, create_router, AppState};
