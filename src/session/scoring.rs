// src/session/scoring.rs

use std::collections::BTreeMap;

use crate::models::question::Question;

/// Number of questions whose recorded answer matches the key.
pub fn count_correct(questions: &[Question], answers: &BTreeMap<usize, u8>) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(index, q)| answers.get(index) == Some(&q.correct_answer_index))
        .count()
}

/// Percentage of correct answers. Unanswered questions count as wrong.
///
/// Returns 0 for an empty set; sessions never start without questions.
pub fn compute_score(questions: &[Question], answers: &BTreeMap<usize, u8>) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    100.0 * count_correct(questions, answers) as f64 / questions.len() as f64
}

/// Correct-answer count derived back from a percentage score.
pub fn correct_answers_from_score(score: f64, total_questions: usize) -> u32 {
    ((score / 100.0) * total_questions as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::question::Category, session::test_support::question};

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| question(i as i64, Category::Verbal, (i % 4) as u8))
            .collect()
    }

    #[test]
    fn unanswered_count_as_wrong() {
        let qs = questions(4);
        let mut answers = BTreeMap::new();
        answers.insert(0, 0);
        assert_eq!(compute_score(&qs, &answers), 25.0);
    }

    #[test]
    fn wrong_answers_do_not_score() {
        let qs = questions(4);
        let answers: BTreeMap<usize, u8> = (0..4).map(|i| (i, 3 - i as u8)).collect();
        assert_eq!(count_correct(&qs, &answers), 0);
        assert_eq!(compute_score(&qs, &answers), 0.0);
    }

    #[test]
    fn score_ignores_which_questions_are_left_blank() {
        let qs = questions(6);
        let first: BTreeMap<usize, u8> = [(0, 0), (1, 1)].into_iter().collect();
        let second: BTreeMap<usize, u8> = [(4, 0), (5, 1)].into_iter().collect();
        assert_eq!(compute_score(&qs, &first), compute_score(&qs, &second));
    }

    #[test]
    fn each_extra_correct_answer_raises_the_score() {
        let qs = questions(15);
        let mut answers = BTreeMap::new();
        let mut previous = compute_score(&qs, &answers);
        for (i, q) in qs.iter().enumerate() {
            answers.insert(i, q.correct_answer_index);
            let next = compute_score(&qs, &answers);
            assert!(next > previous, "score must rise after answer {i}");
            previous = next;
        }
        assert_eq!(previous, 100.0);
    }

    #[test]
    fn empty_set_scores_zero() {
        assert_eq!(compute_score(&[], &BTreeMap::new()), 0.0);
    }

    #[test]
    fn rounding_recovers_exact_count_for_every_set_size() {
        for total in 1..=30usize {
            for correct in 0..=total {
                let score = 100.0 * correct as f64 / total as f64;
                assert_eq!(
                    correct_answers_from_score(score, total),
                    correct as u32,
                    "{correct}/{total}"
                );
            }
        }
    }
}
