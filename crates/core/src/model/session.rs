use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::bank::{BankError, QuestionBank};
use crate::model::question::Question;
use crate::model::result::{QuestionOutcome, ResultError, Score, TestResult};
use crate::model::settings::{ExamSettings, MarkingScheme, TestMode};
use crate::time::seconds_between;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("answer index {index} out of range for a {len}-question test")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{option:?} is not a choice for question {index}")]
    UnknownOption { index: usize, option: String },

    #[error("test session is already completed")]
    Closed,

    #[error(transparent)]
    Result(#[from] ResultError),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    /// Terminal; the result is frozen.
    Completed,
}

/// Counts for a progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unattempted: usize,
    pub is_complete: bool,
}

/// One row of the post-test answer review.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerReview<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub chosen: Option<&'a str>,
    pub outcome: QuestionOutcome,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a test: the sampled questions, the answers given so far,
/// and, once submitted, the frozen result.
///
/// The session never reads the wall clock. Callers pass `now` into every
/// time-dependent call, normally from the services layer `Clock`.
pub struct TestSession {
    subject: String,
    chapter: Option<String>,
    mode: TestMode,
    questions: Vec<Question>,
    answers: BTreeMap<usize, String>,
    started_at: DateTime<Utc>,
    duration_limit_secs: u32,
    marking: MarkingScheme,
    result: Option<TestResult>,
}

impl TestSession {
    /// Start a test by sampling from `bank`.
    ///
    /// `chapter = None` builds the pool from every chapter of `subject`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` with whatever sampling failed with.
    pub fn create(
        bank: &QuestionBank,
        subject: &str,
        chapter: Option<&str>,
        mode: TestMode,
        settings: &ExamSettings,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        Self::create_with(bank, subject, chapter, mode, settings, started_at, &mut rand::rng())
    }

    /// Same as [`TestSession::create`] with a caller-provided random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` with whatever sampling failed with.
    pub fn create_with<R: Rng + ?Sized>(
        bank: &QuestionBank,
        subject: &str,
        chapter: Option<&str>,
        mode: TestMode,
        settings: &ExamSettings,
        started_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        let questions = bank.sample_questions_with(
            subject,
            chapter,
            mode,
            settings.question_limit_for(mode),
            rng,
        )?;
        Ok(Self::new(
            subject,
            chapter,
            mode,
            questions,
            settings.duration_for(mode),
            settings.marking(),
            started_at,
        ))
    }

    /// Build a session around an already chosen question list.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        chapter: Option<&str>,
        mode: TestMode,
        questions: Vec<Question>,
        duration_limit_secs: u32,
        marking: MarkingScheme,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            chapter: chapter.map(str::to_owned),
            mode,
            questions,
            answers: BTreeMap::new(),
            started_at,
            duration_limit_secs,
            marking,
            result: None,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// `None` for a full mock over the whole subject.
    #[must_use]
    pub fn chapter(&self) -> Option<&str> {
        self.chapter.as_deref()
    }

    #[must_use]
    pub fn mode(&self) -> TestMode {
        self.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn duration_limit_secs(&self) -> u32 {
        self.duration_limit_secs
    }

    #[must_use]
    pub fn marking(&self) -> MarkingScheme {
        self.marking
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.result.is_some() {
            SessionState::Completed
        } else {
            SessionState::InProgress
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            unattempted: total.saturating_sub(answered),
            is_complete: self.is_completed(),
        }
    }

    /// Record, change or clear (`None`) the answer to question `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` once the test is completed,
    /// `SessionError::IndexOutOfRange` for a bad index, and
    /// `SessionError::UnknownOption` if `choice` is not one of the
    /// question's options.
    pub fn record_answer(&mut self, index: usize, choice: Option<&str>) -> Result<(), SessionError> {
        if self.is_completed() {
            return Err(SessionError::Closed);
        }
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            })?;

        match choice {
            None => {
                self.answers.remove(&index);
            }
            Some(option) => {
                if !question.has_option(option) {
                    return Err(SessionError::UnknownOption {
                        index,
                        option: option.to_owned(),
                    });
                }
                self.answers.insert(index, option.to_owned());
            }
        }
        Ok(())
    }

    /// Seconds left on the countdown at `now`; never negative.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = seconds_between(self.started_at, now);
        (f64::from(self.duration_limit_secs) - elapsed).max(0.0)
    }

    /// True once the countdown has reached zero. Expiry does not complete the
    /// session on its own; call [`TestSession::expire`].
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(now) <= 0.0
    }

    /// Complete the test and score it.
    ///
    /// Only the first call computes anything. Later calls return the cached
    /// result unchanged, whether they come from the user or the timer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Result` if the result cannot be built.
    pub fn submit(&mut self, completed_at: DateTime<Utc>) -> Result<&TestResult, SessionError> {
        let result = match self.result.take() {
            Some(result) => result,
            None => {
                let score = Score::compute(&self.questions, &self.answers, self.marking)?;
                TestResult::new(score, self.started_at, completed_at.max(self.started_at))?
            }
        };
        Ok(self.result.insert(result))
    }

    /// Timer-driven completion. Behaves exactly like [`TestSession::submit`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Result` if the result cannot be built.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<&TestResult, SessionError> {
        self.submit(now)
    }

    /// Per-question breakdown with the chosen and correct options.
    #[must_use]
    pub fn review(&self) -> Vec<AnswerReview<'_>> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let chosen = self.answer(index);
                AnswerReview {
                    index,
                    question,
                    chosen,
                    outcome: QuestionOutcome::classify(question, chosen),
                }
            })
            .collect()
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("subject", &self.subject)
            .field("chapter", &self.chapter)
            .field("mode", &self.mode)
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("duration_limit_secs", &self.duration_limit_secs)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::model::question::{Difficulty, QuestionDraft};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(n: u64) -> Question {
        QuestionDraft {
            text: format!("Question {n}"),
            options: vec![
                format!("right {n}"),
                format!("wrong-a {n}"),
                format!("wrong-b {n}"),
                format!("wrong-c {n}"),
            ],
            correct_option: format!("right {n}"),
            difficulty: Difficulty::Hard,
            explanation: Some(format!("because {n}")),
            year: None,
        }
        .validate(QuestionId::new(n))
        .unwrap()
    }

    fn session(count: u64) -> TestSession {
        TestSession::new(
            "Physics",
            Some("Optics"),
            TestMode::Chapter,
            (1..=count).map(question).collect(),
            1200,
            MarkingScheme::new(4.0, -1.33).unwrap(),
            fixed_now(),
        )
    }

    fn answer_right(s: &mut TestSession, index: usize) {
        let option = format!("right {}", index + 1);
        s.record_answer(index, Some(&option)).unwrap();
    }

    fn answer_wrong(s: &mut TestSession, index: usize) {
        let option = format!("wrong-a {}", index + 1);
        s.record_answer(index, Some(&option)).unwrap();
    }

    #[test]
    fn new_session_is_in_progress_and_empty() {
        let s = session(3);
        assert_eq!(s.state(), SessionState::InProgress);
        assert!(s.answers().is_empty());
        assert!(s.result().is_none());
        assert_eq!(s.progress().unattempted, 3);
    }

    #[test]
    fn scores_six_right_two_wrong_two_blank() {
        let mut s = session(10);
        for i in 0..6 {
            answer_right(&mut s, i);
        }
        answer_wrong(&mut s, 6);
        answer_wrong(&mut s, 7);

        let result = s.submit(fixed_now() + Duration::seconds(300)).unwrap().clone();
        assert_eq!(result.correct_count(), 6);
        assert_eq!(result.wrong_count(), 2);
        assert_eq!(result.unattempted_count(), 2);
        assert!((result.raw_score() - 21.34).abs() < 1e-9);
        assert!((result.total_possible_marks() - 40.0).abs() < 1e-9);
        assert!((result.percentage() - 53.4).abs() < 1e-9);
        assert_eq!(result.elapsed_seconds(), 300);
    }

    #[test]
    fn all_wrong_keeps_negative_raw_score() {
        let mut s = session(10);
        for i in 0..10 {
            answer_wrong(&mut s, i);
        }
        let result = s.submit(fixed_now()).unwrap();
        assert!((result.raw_score() + 13.3).abs() < 1e-9);
        assert!(result.percentage().abs() < 1e-9);
    }

    #[test]
    fn submit_is_idempotent_and_closes_session() {
        let mut s = session(4);
        answer_right(&mut s, 0);
        let first = s.submit(fixed_now() + Duration::seconds(10)).unwrap().clone();
        let second = s.submit(fixed_now() + Duration::seconds(500)).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first.raw_score().to_bits(), second.raw_score().to_bits());

        let err = s.record_answer(1, Some("right 2")).unwrap_err();
        assert!(matches!(err, SessionError::Closed));
        assert_eq!(s.answers().len(), 1);
        assert_eq!(s.state(), SessionState::Completed);
    }

    #[test]
    fn expire_after_submit_returns_same_result() {
        let mut s = session(2);
        let submitted = s.submit(fixed_now()).unwrap().clone();
        let expired = s.expire(fixed_now() + Duration::seconds(1200)).unwrap().clone();
        assert_eq!(submitted, expired);
    }

    #[test]
    fn rejects_bad_index_and_foreign_option() {
        let mut s = session(2);
        assert!(matches!(
            s.record_answer(2, Some("right 3")),
            Err(SessionError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            s.record_answer(0, Some("right 2")),
            Err(SessionError::UnknownOption { index: 0, .. })
        ));
        assert!(s.answers().is_empty());
    }

    #[test]
    fn answers_can_be_changed_and_cleared() {
        let mut s = session(2);
        answer_wrong(&mut s, 0);
        answer_right(&mut s, 0);
        assert_eq!(s.answer(0), Some("right 1"));
        s.record_answer(0, None).unwrap();
        assert_eq!(s.answer(0), None);

        let result = s.submit(fixed_now()).unwrap();
        assert_eq!(result.unattempted_count(), 2);
    }

    #[test]
    fn countdown_hits_zero_without_completing() {
        let s = session(1);
        let start = fixed_now();
        assert!((s.remaining_seconds(start) - 1200.0).abs() < 1e-9);
        assert!((s.remaining_seconds(start + Duration::milliseconds(200_500)) - 999.5).abs() < 1e-9);

        let deadline = start + Duration::seconds(1200);
        assert!(s.remaining_seconds(deadline).abs() < f64::EPSILON);
        assert!(s.is_expired(deadline));
        assert_eq!(s.state(), SessionState::InProgress);

        let late = start + Duration::hours(5);
        assert!(s.remaining_seconds(late) >= 0.0);
        assert!(s.remaining_seconds(late).abs() < f64::EPSILON);
    }

    #[test]
    fn expire_at_deadline_completes() {
        let mut s = session(3);
        answer_right(&mut s, 1);
        let deadline = fixed_now() + Duration::seconds(1200);
        let result = s.expire(deadline).unwrap();
        assert_eq!(result.elapsed_seconds(), 1200);
        assert_eq!(result.correct_count(), 1);
        assert!(s.is_completed());
    }

    #[test]
    fn completion_before_start_is_clamped() {
        let mut s = session(1);
        let result = s.submit(fixed_now() - Duration::seconds(30)).unwrap();
        assert_eq!(result.elapsed_seconds(), 0);
        assert_eq!(result.completed_at(), fixed_now());
    }

    #[test]
    fn review_lists_outcomes_with_explanations() {
        let mut s = session(3);
        answer_right(&mut s, 0);
        answer_wrong(&mut s, 1);
        let review = s.review();
        let outcomes: Vec<_> = review.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                QuestionOutcome::Correct,
                QuestionOutcome::Wrong,
                QuestionOutcome::Unattempted
            ]
        );
        assert_eq!(review[1].chosen, Some("wrong-a 2"));
        assert_eq!(review[1].question.explanation(), Some("because 2"));
    }

    #[test]
    fn create_samples_from_bank_with_mode_settings() {
        let bank = QuestionBank::builtin().unwrap();
        let settings = ExamSettings::new(20, 1200, 3600, MarkingScheme::default()).unwrap();

        let s = TestSession::create(
            bank,
            "Mathematics",
            Some("Trigonometry & Geometry"),
            TestMode::Chapter,
            &settings,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(s.questions().len(), 20);
        assert_eq!(s.duration_limit_secs(), 1200);
        assert_eq!(s.chapter(), Some("Trigonometry & Geometry"));

        let mock = TestSession::create(bank, "Mathematics", None, TestMode::Full, &settings, fixed_now())
            .unwrap();
        assert_eq!(mock.questions().len(), bank.question_count("Mathematics").unwrap());
        assert_eq!(mock.duration_limit_secs(), 3600);
    }

    #[test]
    fn create_propagates_bank_errors() {
        let bank = QuestionBank::builtin().unwrap();
        let err = TestSession::create(
            bank,
            "NotASubject",
            None,
            TestMode::Full,
            &ExamSettings::default(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Bank(BankError::SubjectNotFound(_))));
    }
}
