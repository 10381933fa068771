//! The question bank: an immutable in-memory catalog grouped by category.
//!
//! The on-disk format is one JSON object mapping a category name
//! to a flat list of questions:
//!
//! ```json
//! {
//!   "general": [
//!     { "id": 1, "question": "2 + 2?", "options": ["3", "4"], "correctAnswer": 1 }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use quizroom_protocol::QuestionPrompt;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::BankError;

/// A multiple-choice question. Never mutated once the bank is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_correct(&self, answer_index: usize) -> bool {
        answer_index == self.correct_answer
    }

    /// The client-facing view of this question, without the answer.
    pub fn prompt(&self, question_number: usize, total_questions: usize, time_limit: u64) -> QuestionPrompt {
        QuestionPrompt {
            id: self.id,
            question: self.question.clone(),
            options: self.options.clone(),
            question_number,
            total_questions,
            time_limit,
        }
    }

    fn validate(&self, category: &str) -> Result<(), BankError> {
        let invalid = |reason: &str| BankError::InvalidQuestion {
            category: category.to_string(),
            id: self.id,
            reason: reason.to_string(),
        };
        if self.options.is_empty() {
            return Err(invalid("no options"));
        }
        if self.correct_answer >= self.options.len() {
            return Err(invalid("correctAnswer is out of range"));
        }
        Ok(())
    }
}

/// Questions grouped by category.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    categories: HashMap<String, Vec<Question>>,
}

impl QuestionBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a bank from JSON text and validates every question.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let categories: HashMap<String, Vec<Question>> = serde_json::from_str(json)?;
        let mut bank = Self::new();
        for (category, questions) in categories {
            bank.insert(category, questions)?;
        }
        Ok(bank)
    }

    /// Reads and parses a bank file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Adds questions to a category, validating each one.
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<(), BankError> {
        let category = category.into();
        for question in &questions {
            question.validate(&category)?;
        }
        self.categories.entry(category).or_default().extend(questions);
        Ok(())
    }

    /// Number of questions in a category (0 if it doesn't exist).
    pub fn len(&self, category: &str) -> usize {
        self.categories.get(category).map_or(0, Vec::len)
    }

    /// Returns `true` if no category holds any question.
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Vec::is_empty)
    }

    /// Category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Draws up to `count` distinct questions from `category` in random
    /// order, using the thread-local RNG.
    pub fn draw(&self, count: usize, category: &str) -> Vec<Question> {
        self.draw_with(&mut rand::rng(), count, category)
    }

    /// Like [`draw`](Self::draw) with a caller-supplied RNG.
    ///
    /// Never returns more than the category holds, and never the same
    /// entry twice.
    pub fn draw_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        category: &str,
    ) -> Vec<Question> {
        let Some(pool) = self.categories.get(category) else {
            return Vec::new();
        };
        let mut picks: Vec<&Question> = pool.iter().collect();
        picks.shuffle(rng);
        picks.truncate(count);
        picks.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn question(id: u32) -> Question {
        Question {
            id,
            question: format!("Question {id}?"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: 1,
            explanation: None,
        }
    }

    fn bank_with(n: u32) -> QuestionBank {
        let mut bank = QuestionBank::new();
        bank.insert("general", (1..=n).map(question).collect()).unwrap();
        bank
    }

    #[test]
    fn test_draw_returns_distinct_questions() {
        let bank = bank_with(10);
        let mut rng = StdRng::seed_from_u64(7);
        let drawn = bank.draw_with(&mut rng, 6, "general");
        assert_eq!(drawn.len(), 6);
        let ids: HashSet<u32> = drawn.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_draw_caps_at_available_count() {
        let bank = bank_with(3);
        assert_eq!(bank.draw(10, "general").len(), 3);
    }

    #[test]
    fn test_draw_unknown_category_returns_empty() {
        assert!(bank_with(3).draw(2, "history").is_empty());
    }

    #[test]
    fn test_from_json_parses_camel_case_fields() {
        let bank = QuestionBank::from_json(
            r#"{"science":[{"id":9,"question":"H2O is?","options":["water","salt"],"correctAnswer":0,"explanation":"Two hydrogens, one oxygen."}]}"#,
        )
        .unwrap();
        assert_eq!(bank.len("science"), 1);
        let q = &bank.draw(1, "science")[0];
        assert!(q.is_correct(0));
        assert_eq!(q.explanation.as_deref(), Some("Two hydrogens, one oxygen."));
    }

    #[test]
    fn test_from_json_rejects_out_of_range_answer() {
        let result = QuestionBank::from_json(
            r#"{"general":[{"id":1,"question":"?","options":["x"],"correctAnswer":3}]}"#,
        );
        assert!(matches!(result, Err(BankError::InvalidQuestion { id: 1, .. })));
    }

    #[test]
    fn test_from_json_rejects_malformed_text() {
        assert!(matches!(
            QuestionBank::from_json("{ nope"),
            Err(BankError::Parse(_))
        ));
    }

    #[test]
    fn test_prompt_omits_answer_and_numbers_from_one() {
        let prompt = question(4).prompt(1, 5, 30);
        assert_eq!(prompt.id, 4);
        assert_eq!(prompt.question_number, 1);
        assert_eq!(prompt.total_questions, 5);
        assert_eq!(prompt.options.len(), 3);
    }

    #[test]
    fn test_categories_sorted() {
        let mut bank = bank_with(1);
        bank.insert("art", vec![question(50)]).unwrap();
        assert_eq!(bank.categories(), vec!["art", "general"]);
        assert!(!bank.is_empty());
    }
}
