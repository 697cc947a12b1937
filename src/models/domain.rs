//! Domain records exchanged with the backend

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// The caller, as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: None,
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
}

impl Question {
    /// Creates a question with no display content.
    pub fn with_answer(correct_answer: usize) -> Self {
        Self {
            text: String::new(),
            options: Vec::new(),
            correct_answer,
        }
    }
}

/// A quiz row.
///
/// `questions` is stored either as a JSON array or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(deserialize_with = "questions_from_array_or_string")]
    pub questions: Vec<Question>,
    /// Minimum percentage (0-100) required to pass
    pub passing_score: f64,
}

impl Quiz {
    pub fn new(id: impl Into<String>, questions: Vec<Question>, passing_score: f64) -> Self {
        Self {
            id: id.into(),
            lesson_id: None,
            questions,
            passing_score,
        }
    }

    pub fn for_lesson(mut self, lesson_id: impl Into<String>) -> Self {
        self.lesson_id = Some(lesson_id.into());
        self
    }
}

fn questions_from_array_or_string<'de, D>(deserializer: D) -> Result<Vec<Question>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<Question>),
        Encoded(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(questions) => Ok(questions),
        Raw::Encoded(text) => serde_json::from_str(&text).map_err(de::Error::custom),
    }
}

/// Course progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
}

/// A row of the course-progress store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub user_id: String,
    pub course_id: String,
    pub grade: f64,
    pub status: ProgressStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CourseProgress {
    /// A completed record stamped with the current time.
    pub fn completed(user_id: impl Into<String>, course_id: impl Into<String>, grade: f64) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            grade,
            status: ProgressStatus::Completed,
            completed_at: Some(Utc::now()),
        }
    }
}
