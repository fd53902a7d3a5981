use std::sync::Arc;

use gradeup_core::model::{ExamSettings, QuestionBank};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::navigation::Navigator;
use crate::results_service::ResultsService;
use crate::sessions::TestLoopService;
use crate::user_service::UserService;

/// Assembles app-facing services over one storage backend and question bank.
#[derive(Clone)]
pub struct AppServices {
    bank: Arc<QuestionBank>,
    settings: ExamSettings,
    test_loop: Arc<TestLoopService>,
    results: Arc<ResultsService>,
    users: Arc<UserService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the built-in bank.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// built-in bank does not load.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: ExamSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let bank = Arc::new(QuestionBank::builtin()?.clone());
        tracing::info!(
            subjects = bank.list_subjects().len(),
            "storage ready and question bank loaded"
        );
        Ok(Self::from_parts(&storage, bank, clock, settings))
    }

    /// Wire services from already built parts.
    #[must_use]
    pub fn from_parts(
        storage: &Storage,
        bank: Arc<QuestionBank>,
        clock: Clock,
        settings: ExamSettings,
    ) -> Self {
        let test_loop = Arc::new(TestLoopService::new(
            clock,
            Arc::clone(&bank),
            settings.clone(),
            Arc::clone(&storage.results),
        ));
        let results = Arc::new(ResultsService::new(Arc::clone(&storage.results)));
        let users = Arc::new(UserService::new(clock, Arc::clone(&storage.users)));

        Self {
            bank,
            settings,
            test_loop,
            results,
            users,
        }
    }

    #[must_use]
    pub fn bank(&self) -> Arc<QuestionBank> {
        Arc::clone(&self.bank)
    }

    #[must_use]
    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    #[must_use]
    pub fn test_loop(&self) -> Arc<TestLoopService> {
        Arc::clone(&self.test_loop)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    /// A fresh navigator on the landing screen.
    #[must_use]
    pub fn navigator(&self) -> Navigator {
        Navigator::new(Arc::clone(&self.bank))
    }
}
