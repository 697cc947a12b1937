//! Request, response and domain models for the gateway
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP bodies and backend rows.

pub mod domain;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use domain::{AuthUser, CourseProgress, ProgressStatus, Question, Quiz};
pub use requests::{ApiRequest, SubmitQuizRequest};
pub use responses::{DataEnvelope, ErrorBody, ErrorEnvelope, HealthResponse};
