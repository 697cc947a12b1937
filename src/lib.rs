//! LMS Gateway - An authenticated REST gateway for a learning-management backend
//!
//! Dispatches bearer-authenticated requests to registered handlers backed by
//! a managed database, and grades quiz submissions.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod grading;
pub mod models;

pub use api::{AppState, Dispatcher};
pub use config::Config;
pub use grading::{grade, GradeResult};
