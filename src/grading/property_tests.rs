//! Property-Based Tests for Grading Module
//!
//! Uses proptest to check the grading rules over arbitrary quizzes.

use proptest::prelude::*;

use crate::backend::InMemoryBackend;
use crate::grading::{grade, record_completion};
use crate::models::{AuthUser, Question, Quiz};

// == Test Configuration ==
const MAX_QUESTIONS: usize = 20;
const MAX_OPTION: usize = 4;

// == Strategies ==
/// Generates a quiz with 1..MAX_QUESTIONS questions and a threshold in 0..=100
fn quiz_strategy() -> impl Strategy<Value = Quiz> {
    (
        prop::collection::vec(0..MAX_OPTION, 1..MAX_QUESTIONS),
        0u32..=100,
    )
        .prop_map(|(correct, passing)| {
            let questions = correct.into_iter().map(Question::with_answer).collect();
            Quiz::new("quiz", questions, f64::from(passing)).for_lesson("lesson")
        })
}

/// Generates answer lists that may be shorter or longer than the quiz
fn answers_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..MAX_OPTION, 0..MAX_QUESTIONS + 5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The score is always a percentage and pass/fail follows the threshold.
    #[test]
    fn prop_score_bounded_and_threshold_respected(
        quiz in quiz_strategy(),
        answers in answers_strategy(),
    ) {
        let result = grade(&quiz, &answers);
        prop_assert!((0.0..=100.0).contains(&result.score));
        prop_assert_eq!(result.passed, result.score >= quiz.passing_score);
    }

    // Grading is a pure function of its inputs.
    #[test]
    fn prop_grading_is_idempotent(quiz in quiz_strategy(), answers in answers_strategy()) {
        let first = grade(&quiz, &answers);
        let second = grade(&quiz, &answers);
        prop_assert_eq!(first, second);
    }

    // Answer i is compared with question i and nothing else.
    #[test]
    fn prop_score_counts_positional_matches(
        quiz in quiz_strategy(),
        answers in answers_strategy(),
    ) {
        let matches = quiz
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| answers.get(*i) == Some(&q.correct_answer))
            .count();
        let expected = 100.0 * matches as f64 / quiz.questions.len() as f64;

        let result = grade(&quiz, &answers);
        prop_assert!((result.score - expected).abs() < 1e-9);
    }

    // Submitting the answer key always scores 100, with or without trailing extras.
    #[test]
    fn prop_answer_key_scores_full(quiz in quiz_strategy(), extra in answers_strategy()) {
        let mut key: Vec<usize> = quiz.questions.iter().map(|q| q.correct_answer).collect();
        key.extend(extra);

        let result = grade(&quiz, &key);
        prop_assert_eq!(result.score, 100.0);
        prop_assert!(result.passed);
    }

    // Dropping trailing answers can only lower the score.
    #[test]
    fn prop_truncation_never_raises_score(
        quiz in quiz_strategy(),
        answers in answers_strategy(),
        cut in 0usize..MAX_QUESTIONS,
    ) {
        let truncated = &answers[..cut.min(answers.len())];
        prop_assert!(grade(&quiz, truncated).score <= grade(&quiz, &answers).score);
    }

    // Repeated passing submissions leave exactly one completed row per course.
    #[test]
    fn prop_repeated_completion_keeps_single_row(
        quiz in quiz_strategy(),
        repeats in 1usize..5,
    ) {
        let key: Vec<usize> = quiz.questions.iter().map(|q| q.correct_answer).collect();
        let result = grade(&quiz, &key);

        let rows = tokio_test::block_on(async {
            let store = InMemoryBackend::new();
            store.add_lesson("lesson", "course").await;
            let user = AuthUser::new("learner");
            store.add_user("learner-token", user.clone()).await;
            for _ in 0..repeats {
                record_completion(&store, &user, "learner-token", &quiz, &result)
                    .await
                    .unwrap();
            }
            store.progress().await
        });

        prop_assert_eq!(rows.len(), 1);
        prop_assert_eq!(rows[0].grade, 100.0);
    }
}
