use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Every question offers exactly this many choices.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("expected {OPTION_COUNT} options, found {found}")]
    OptionCount { found: usize },

    #[error("options cannot be empty")]
    EmptyOption,

    #[error("duplicate option: {0}")]
    DuplicateOption(String),

    #[error("correct option is not among the options: {0}")]
    MissingCorrectOption(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Informational tag; has no effect on scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in the bank document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl QuestionDraft {
    /// Check the draft and give it an identity.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, the option count is not
    /// `OPTION_COUNT`, an option is blank or repeated, or the correct option is
    /// not one of the options.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.len() != OPTION_COUNT {
            return Err(QuestionError::OptionCount {
                found: self.options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(OPTION_COUNT);
        for option in &self.options {
            if option.trim().is_empty() {
                return Err(QuestionError::EmptyOption);
            }
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption(option.clone()));
            }
        }
        if !seen.contains(self.correct_option.as_str()) {
            return Err(QuestionError::MissingCorrectOption(self.correct_option));
        }

        Ok(Question {
            id,
            text,
            options: self.options,
            correct_option: self.correct_option,
            difficulty: self.difficulty,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            year: self.year.filter(|y| !y.trim().is_empty()),
        })
    }
}

/// One exam item.
///
/// Correctness is stored as the option text rather than a position, so any
/// permutation of `options` keeps the question answerable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: String,
    difficulty: Difficulty,
    explanation: Option<String>,
    year: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.correct_option
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_option == option
    }

    /// Position of the correct option in the current ordering.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| *o == self.correct_option)
    }

    /// Copy of this question with its options uniformly permuted.
    ///
    /// The receiver is left untouched.
    #[must_use]
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Question {
        let mut copy = self.clone();
        copy.options.shuffle(rng);
        copy
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
