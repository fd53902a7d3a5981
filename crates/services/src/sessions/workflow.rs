use std::sync::Arc;

use gradeup_core::model::{ExamSettings, QuestionBank, ResultId, TestMode, TestResult, TestSession};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::{ResultRecord, ResultRepository};

use super::active::ActiveTest;
use crate::Clock;
use crate::error::TestError;

/// What a finished test produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub result: TestResult,
    pub result_id: ResultId,
}

/// Orchestrates one attempt: sampling, answering, the countdown, and
/// persisting the result when the test ends.
#[derive(Clone)]
pub struct TestLoopService {
    clock: Clock,
    bank: Arc<QuestionBank>,
    settings: ExamSettings,
    results: Arc<dyn ResultRepository>,
    seed: Option<u64>,
}

impl TestLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: Arc<QuestionBank>,
        settings: ExamSettings,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            bank,
            settings,
            results,
            seed: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Sample every test from a fixed seed instead of the thread RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    /// Start a test on `subject`, optionally narrowed to one chapter.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Session` when the subject or chapter is unknown or
    /// the pool is empty.
    pub fn start_test(
        &self,
        subject: &str,
        chapter: Option<&str>,
        mode: TestMode,
    ) -> Result<ActiveTest, TestError> {
        let now = self.clock.now();
        let session = match self.seed {
            Some(seed) => TestSession::create_with(
                &self.bank,
                subject,
                chapter,
                mode,
                &self.settings,
                now,
                &mut StdRng::seed_from_u64(seed),
            ),
            None => TestSession::create(&self.bank, subject, chapter, mode, &self.settings, now),
        }
        .inspect_err(|e| tracing::warn!(subject, ?chapter, "could not start test: {e}"))?;

        tracing::info!(
            subject,
            ?chapter,
            mode = mode.as_str(),
            questions = session.questions().len(),
            duration_secs = session.duration_limit_secs(),
            "test started"
        );
        Ok(ActiveTest::new(session))
    }

    /// Up to the chapter limit of questions from one chapter.
    ///
    /// # Errors
    ///
    /// See [`TestLoopService::start_test`].
    pub fn start_chapter_practice(
        &self,
        subject: &str,
        chapter: &str,
    ) -> Result<ActiveTest, TestError> {
        self.start_test(subject, Some(chapter), TestMode::Chapter)
    }

    /// Every question of every chapter of `subject`.
    ///
    /// # Errors
    ///
    /// See [`TestLoopService::start_test`].
    pub fn start_full_mock(&self, subject: &str) -> Result<ActiveTest, TestError> {
        self.start_test(subject, None, TestMode::Full)
    }

    /// Record, change, or clear (`choice = None`) the answer to one question.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Session` for a bad index or option, or once the
    /// test is completed.
    pub fn answer(
        &self,
        test: &mut ActiveTest,
        index: usize,
        choice: Option<&str>,
    ) -> Result<(), TestError> {
        test.session_mut().record_answer(index, choice)?;
        tracing::debug!(index, answered = choice.is_some(), "answer recorded");
        Ok(())
    }

    #[must_use]
    pub fn remaining_seconds(&self, test: &ActiveTest) -> f64 {
        test.session().remaining_seconds(self.clock.now())
    }

    /// User-initiated completion. Scores the test and stores the result.
    ///
    /// Calling it again (or after the timer fired) returns the stored outcome
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `TestError::Storage` if the result cannot be persisted. The
    /// session stays completed and a later call retries the write.
    pub async fn submit(&self, user: &str, test: &mut ActiveTest) -> Result<TestOutcome, TestError> {
        let percentage = test.session_mut().submit(self.clock.now())?.percentage();
        tracing::info!(user, percentage, "test submitted");
        self.persist(user, test).await
    }

    /// Timer-driven completion. Same scoring and idempotency as `submit`.
    ///
    /// # Errors
    ///
    /// See [`TestLoopService::submit`].
    pub async fn expire(&self, user: &str, test: &mut ActiveTest) -> Result<TestOutcome, TestError> {
        let percentage = test.session_mut().expire(self.clock.now())?.percentage();
        tracing::info!(user, percentage, "test expired");
        self.persist(user, test).await
    }

    /// Periodic timer check. Expires and stores the test once the countdown
    /// has run out; otherwise does nothing and returns `None`.
    ///
    /// # Errors
    ///
    /// See [`TestLoopService::submit`].
    pub async fn tick(
        &self,
        user: &str,
        test: &mut ActiveTest,
    ) -> Result<Option<TestOutcome>, TestError> {
        if test.is_persisted() || !test.session().is_expired(self.clock.now()) {
            return Ok(None);
        }
        self.expire(user, test).await.map(Some)
    }

    async fn persist(&self, user: &str, test: &mut ActiveTest) -> Result<TestOutcome, TestError> {
        let record =
            ResultRecord::from_session(user, test.session()).ok_or(TestError::NotCompleted)?;
        if let Some(result_id) = test.result_id() {
            return Ok(TestOutcome {
                result: record.result,
                result_id,
            });
        }

        let result_id = self
            .results
            .append_result(&record)
            .await
            .inspect_err(|e| tracing::error!(user, "failed to store test result: {e}"))?;
        test.set_result_id(result_id);
        tracing::info!(user, result_id = result_id.value(), "test result stored");

        Ok(TestOutcome {
            result: record.result,
            result_id,
        })
    }
}
