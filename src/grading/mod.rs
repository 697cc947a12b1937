//! Grading Module
//!
//! Positional quiz grading plus the progress write that follows a pass.

mod completion;
mod grade;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use completion::record_completion;
pub use grade::{grade, GradeResult};
