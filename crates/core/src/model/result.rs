use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::question::Question;
use crate::model::settings::MarkingScheme;
use crate::time::whole_seconds_between;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single test: {len}")]
    TooManyQuestions { len: usize },

    #[error("question count ({total}) does not match outcome counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("percentage out of range: {0}")]
    InvalidPercentage(f64),
}

/// How one question fared once the test is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionOutcome {
    Correct,
    Wrong,
    Unattempted,
}

impl QuestionOutcome {
    #[must_use]
    pub fn classify(question: &Question, chosen: Option<&str>) -> Self {
        match chosen {
            None => QuestionOutcome::Unattempted,
            Some(option) if question.is_correct(option) => QuestionOutcome::Correct,
            Some(_) => QuestionOutcome::Wrong,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Marks and counts for a set of answers. No timing information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    correct: u32,
    wrong: u32,
    unattempted: u32,
    raw_score: f64,
    total_possible_marks: f64,
    percentage: f64,
}

impl Score {
    /// Score `answers` (question index to chosen option) against `questions`.
    ///
    /// Answer keys outside `questions` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::TooManyQuestions` if the count does not fit in `u32`.
    pub fn compute(
        questions: &[Question],
        answers: &BTreeMap<usize, String>,
        marking: MarkingScheme,
    ) -> Result<Self, ResultError> {
        if u32::try_from(questions.len()).is_err() {
            return Err(ResultError::TooManyQuestions {
                len: questions.len(),
            });
        }

        let mut correct = 0_u32;
        let mut wrong = 0_u32;
        let mut unattempted = 0_u32;
        for (index, question) in questions.iter().enumerate() {
            match QuestionOutcome::classify(question, answers.get(&index).map(String::as_str)) {
                QuestionOutcome::Correct => correct += 1,
                QuestionOutcome::Wrong => wrong += 1,
                QuestionOutcome::Unattempted => unattempted += 1,
            }
        }

        Ok(Self::from_counts(correct, wrong, unattempted, marking))
    }

    /// Apply the marking scheme to outcome counts.
    ///
    /// `raw_score` keeps its sign and is stored rounded to 2 decimals.
    /// `percentage` is taken from the unrounded score with negatives clamped
    /// to zero, then rounded to 1 decimal. It is zero when there is nothing to
    /// score.
    #[must_use]
    pub fn from_counts(correct: u32, wrong: u32, unattempted: u32, marking: MarkingScheme) -> Self {
        let raw = f64::from(correct) * marking.marks_per_correct()
            + f64::from(wrong) * marking.marks_per_wrong();
        let raw_score = round_to(raw, 2);

        let question_count = correct + wrong + unattempted;
        let total_possible_marks = f64::from(question_count) * marking.marks_per_correct();
        let percentage = if total_possible_marks > 0.0 {
            round_to(raw.max(0.0) / total_possible_marks * 100.0, 1)
        } else {
            0.0
        };

        Self {
            correct,
            wrong,
            unattempted,
            raw_score,
            total_possible_marks,
            percentage,
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    #[must_use]
    pub fn unattempted(&self) -> u32 {
        self.unattempted
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.correct + self.wrong + self.unattempted
    }

    #[must_use]
    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }

    #[must_use]
    pub fn total_possible_marks(&self) -> f64 {
        self.total_possible_marks
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }
}

/// Frozen scoring snapshot of a completed test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    score: Score,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    elapsed_seconds: u64,
}

impl TestResult {
    /// Attach timing to a score.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::InvalidTimeRange` if `completed_at` is before `started_at`.
    pub fn new(
        score: Score,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        if completed_at < started_at {
            return Err(ResultError::InvalidTimeRange);
        }
        Ok(Self {
            score,
            started_at,
            completed_at,
            elapsed_seconds: whole_seconds_between(started_at, completed_at),
        })
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::CountMismatch` if the outcome counts do not add
    /// up to `question_count`, `ResultError::InvalidTimeRange` for reversed
    /// timestamps, and `ResultError::InvalidPercentage` outside `0..=100`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        question_count: u32,
        correct: u32,
        wrong: u32,
        unattempted: u32,
        raw_score: f64,
        total_possible_marks: f64,
        percentage: f64,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        elapsed_seconds: u64,
    ) -> Result<Self, ResultError> {
        let sum = correct.saturating_add(wrong).saturating_add(unattempted);
        if sum != question_count {
            return Err(ResultError::CountMismatch {
                total: question_count,
                sum,
            });
        }
        if completed_at < started_at {
            return Err(ResultError::InvalidTimeRange);
        }
        if !(0.0..=100.0).contains(&percentage) {
            return Err(ResultError::InvalidPercentage(percentage));
        }

        Ok(Self {
            score: Score {
                correct,
                wrong,
                unattempted,
                raw_score,
                total_possible_marks,
                percentage,
            },
            started_at,
            completed_at,
            elapsed_seconds,
        })
    }

    #[must_use]
    pub fn score(&self) -> &Score {
        &self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.score.correct
    }

    #[must_use]
    pub fn wrong_count(&self) -> u32 {
        self.score.wrong
    }

    #[must_use]
    pub fn unattempted_count(&self) -> u32 {
        self.score.unattempted
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.score.question_count()
    }

    #[must_use]
    pub fn raw_score(&self) -> f64 {
        self.score.raw_score
    }

    #[must_use]
    pub fn total_possible_marks(&self) -> f64 {
        self.score.total_possible_marks
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.score.percentage
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }
}
