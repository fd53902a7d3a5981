use async_trait::async_trait;
use gradeup_core::model::{ResultId, TestMode, TestResult, TestSession, User};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A completed test plus the metadata the leaderboard needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub user: String,
    pub subject: String,
    /// `None` for a full mock.
    pub chapter: Option<String>,
    pub mode: TestMode,
    pub result: TestResult,
}

impl ResultRecord {
    /// Snapshot a completed session for `user`. Returns `None` while the
    /// session is still in progress.
    #[must_use]
    pub fn from_session(user: &str, session: &TestSession) -> Option<Self> {
        let result = session.result()?.clone();
        Some(Self {
            user: user.to_owned(),
            subject: session.subject().to_owned(),
            chapter: session.chapter().map(str::to_owned),
            mode: session.mode(),
            result,
        })
    }
}

/// A stored result with its row identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: ResultId,
    pub record: ResultRecord,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: ResultId, record: ResultRecord) -> Self {
        Self { id, record }
    }
}

/// Leaderboard order: best percentage first, then fastest, then oldest row.
#[must_use]
pub fn leaderboard_order(a: &ResultRow, b: &ResultRow) -> Ordering {
    b.record
        .result
        .percentage()
        .total_cmp(&a.record.result.percentage())
        .then_with(|| {
            a.record
                .result
                .elapsed_seconds()
                .cmp(&b.record.result.elapsed_seconds())
        })
        .then_with(|| a.id.cmp(&b.id))
}

/// Append-only store of completed test results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist one result and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError>;

    /// Fetch a result by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<ResultRow, StorageError>;

    /// All results of one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_user_results(&self, user: &str) -> Result<Vec<ResultRow>, StorageError>;

    /// Top `limit` results across all users, in [`leaderboard_order`].
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn leaderboard(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, or update the course of an existing one. The original
    /// registration time is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn get_user(&self, name: &str) -> Result<Option<User>, StorageError>;

    /// Remove a user. Returns whether a row existed. Results are kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn delete_user(&self, name: &str) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ResultRow>>>,
    users: Arc<Mutex<HashMap<String, User>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let next = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        let id = ResultId::new(next);
        guard.push(ResultRow::new(id, record.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<ResultRow, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_user_results(&self, user: &str) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|row| row.record.user == user)
            .cloned()
            .collect())
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut rows = guard.clone();
        rows.sort_by(leaderboard_order);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        let stored = match guard.get(user.name()) {
            Some(existing) => User::new(existing.name(), user.course(), existing.registered_at())
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            None => user.clone(),
        };
        guard.insert(stored.name().to_owned(), stored);
        Ok(())
    }

    async fn get_user(&self, name: &str) -> Result<Option<User>, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.get(name).cloned())
    }

    async fn delete_user(&self, name: &str) -> Result<bool, StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.remove(name).is_some())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ResultRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let results: Arc<dyn ResultRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo);
        Self { results, users }
    }
}
