//! Quiz Grading
//!
//! Scores a submission against a quiz, position by position.

use serde::Serialize;

use crate::models::Quiz;

// == Grade Result ==
/// Outcome of grading one submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeResult {
    /// Percentage of correct answers (0.0 to 100.0)
    pub score: f64,
    pub passed: bool,
}

// == Grade ==
/// Grades `answers` against `quiz`.
///
/// Answer `i` is compared with question `i` only. Missing answers count as
/// incorrect and answers past the last question are ignored. A quiz without
/// questions scores 0 and never passes.
pub fn grade(quiz: &Quiz, answers: &[usize]) -> GradeResult {
    let total = quiz.questions.len();
    if total == 0 {
        return GradeResult {
            score: 0.0,
            passed: false,
        };
    }

    let correct = quiz
        .questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| question.correct_answer == **answer)
        .count();

    let score = 100.0 * correct as f64 / total as f64;
    GradeResult {
        score,
        passed: score >= quiz.passing_score,
    }
}
