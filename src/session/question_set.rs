// src/session/question_set.rs

use crate::{
    config::{MAX_TEST_QUESTIONS, QUESTIONS_PER_CATEGORY},
    models::question::{Category, Question},
};

/// Builds the question set for one attempt from the full bank.
///
/// Takes the first [`QUESTIONS_PER_CATEGORY`] questions encountered of each
/// aptitude section and concatenates them verbal, quantitative, general.
/// Other categories are ignored. An empty result means no test is available.
pub fn assemble_question_set<I>(all_questions: I) -> Vec<Question>
where
    I: IntoIterator<Item = Question>,
{
    let mut sections: [Vec<Question>; 3] = Default::default();

    for question in all_questions {
        let Some(slot) = Category::APTITUDE_SECTIONS
            .iter()
            .position(|c| *c == question.category)
        else {
            continue;
        };
        if sections[slot].len() < QUESTIONS_PER_CATEGORY {
            sections[slot].push(question);
        }
    }

    let mut set: Vec<Question> = sections.into_iter().flatten().collect();
    set.truncate(MAX_TEST_QUESTIONS);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::bank;

    fn categories(set: &[Question]) -> Vec<Category> {
        set.iter().map(|q| q.category).collect()
    }

    #[test]
    fn full_bank_yields_thirty_in_section_order() {
        // Interleave categories so ordering has to come from assembly, not input.
        let mut all = Vec::new();
        all.extend(bank(Category::General, 300, 14));
        all.extend(bank(Category::Quantitative, 200, 11));
        all.extend(bank(Category::Verbal, 100, 12));
        all.extend(bank(Category::Law, 400, 5));

        let set = assemble_question_set(all);

        assert_eq!(set.len(), 30);
        let cats = categories(&set);
        assert!(cats[..10].iter().all(|c| *c == Category::Verbal));
        assert!(cats[10..20].iter().all(|c| *c == Category::Quantitative));
        assert!(cats[20..].iter().all(|c| *c == Category::General));
    }

    #[test]
    fn takes_first_encountered_of_each_section() {
        let set = assemble_question_set(bank(Category::Verbal, 1, 12));
        let ids: Vec<i64> = set.iter().map(|q| q.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn short_sections_are_not_padded() {
        let mut all = bank(Category::Verbal, 1, 12);
        all.extend(bank(Category::Quantitative, 100, 5));

        let set = assemble_question_set(all);

        assert_eq!(set.len(), 15);
        let cats = categories(&set);
        assert_eq!(cats.iter().filter(|c| **c == Category::Verbal).count(), 10);
        assert_eq!(cats.iter().filter(|c| **c == Category::Quantitative).count(), 5);
        assert_eq!(cats.iter().filter(|c| **c == Category::General).count(), 0);
    }

    #[test]
    fn bank_without_aptitude_questions_is_empty() {
        let mut all = bank(Category::Medical, 1, 20);
        all.extend(bank(Category::Arts, 50, 3));
        assert!(assemble_question_set(all).is_empty());
        assert!(assemble_question_set(Vec::new()).is_empty());
    }
}
