use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gradeup_core::model::{ResultId, TestMode};
use storage::repository::{ResultRepository, ResultRow};

use crate::error::ResultsError;

/// Rows shown when no explicit leaderboard size is asked for.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 25;

//
// ─── VIEW MODELS ───────────────────────────────────────────────────────────────
//

/// One ranked line of the leaderboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardItem {
    pub rank: usize,
    pub id: ResultId,
    pub user: String,
    pub subject: String,
    pub chapter: Option<String>,
    pub mode: TestMode,
    pub raw_score: f64,
    pub percentage: f64,
    pub elapsed_seconds: u64,
    pub completed_at: DateTime<Utc>,
}

impl LeaderboardItem {
    fn from_row(rank: usize, row: ResultRow) -> Self {
        let result = &row.record.result;
        Self {
            rank,
            id: row.id,
            raw_score: result.raw_score(),
            percentage: result.percentage(),
            elapsed_seconds: result.elapsed_seconds(),
            completed_at: result.completed_at(),
            user: row.record.user,
            subject: row.record.subject,
            chapter: row.record.chapter,
            mode: row.record.mode,
        }
    }
}

/// Mean percentage over every test a user took in one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectAverage {
    pub subject: String,
    pub tests_taken: usize,
    pub average_percentage: f64,
}

/// Per-user aggregate for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub tests_taken: usize,
    /// Zero when no tests were taken.
    pub average_percentage: f64,
    /// Highest percentage; the earliest such result wins ties.
    pub best: Option<ResultRow>,
    /// Subject with the highest mean percentage.
    pub best_subject: Option<SubjectAverage>,
    pub total_correct: u64,
    pub total_wrong: u64,
}

impl DashboardStats {
    /// Aggregate a user's history (oldest first).
    #[must_use]
    pub fn from_history(history: &[ResultRow]) -> Self {
        let tests_taken = history.len();
        let mut total_correct = 0_u64;
        let mut total_wrong = 0_u64;
        let mut percentage_sum = 0.0_f64;
        let mut best: Option<&ResultRow> = None;
        let mut by_subject: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

        for row in history {
            let result = &row.record.result;
            total_correct += u64::from(result.correct_count());
            total_wrong += u64::from(result.wrong_count());
            percentage_sum += result.percentage();

            if best.is_none_or(|b| result.percentage() > b.record.result.percentage()) {
                best = Some(row);
            }

            let entry = by_subject.entry(row.record.subject.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += result.percentage();
        }

        let average_percentage = if tests_taken == 0 {
            0.0
        } else {
            percentage_sum / count_as_f64(tests_taken)
        };

        let mut best_subject: Option<SubjectAverage> = None;
        for (subject, (count, sum)) in by_subject {
            let mean = sum / count_as_f64(count);
            if best_subject
                .as_ref()
                .is_none_or(|b| mean > b.average_percentage)
            {
                best_subject = Some(SubjectAverage {
                    subject: subject.to_owned(),
                    tests_taken: count,
                    average_percentage: mean,
                });
            }
        }

        Self {
            tests_taken,
            average_percentage,
            best: best.cloned(),
            best_subject,
            total_correct,
            total_wrong,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(n: usize) -> f64 {
    n as f64
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-side queries over stored results.
#[derive(Clone)]
pub struct ResultsService {
    results: Arc<dyn ResultRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Best results across all users, ranked from 1.
    ///
    /// `None` uses [`DEFAULT_LEADERBOARD_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if the query fails.
    pub async fn leaderboard(&self, limit: Option<u32>) -> Result<Vec<LeaderboardItem>, ResultsError> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let rows = self.results.leaderboard(limit).await?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardItem::from_row(i + 1, row))
            .collect())
    }

    /// Every result of `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if the query fails.
    pub async fn history(&self, user: &str) -> Result<Vec<ResultRow>, ResultsError> {
        Ok(self.results.list_user_results(user).await?)
    }

    /// # Errors
    ///
    /// Returns `ResultsError::Storage` if the query fails.
    pub async fn dashboard(&self, user: &str) -> Result<DashboardStats, ResultsError> {
        let history = self.history(user).await?;
        Ok(DashboardStats::from_history(&history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gradeup_core::model::{MarkingScheme, Score, TestResult};
    use gradeup_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ResultRecord};

    fn record(user: &str, subject: &str, correct: u32, wrong: u32, elapsed: i64) -> ResultRecord {
        let score = Score::from_counts(correct, wrong, 10 - correct - wrong, MarkingScheme::default());
        let start = fixed_now();
        ResultRecord {
            user: user.into(),
            subject: subject.into(),
            chapter: None,
            mode: TestMode::Full,
            result: TestResult::new(score, start, start + Duration::seconds(elapsed)).unwrap(),
        }
    }

    #[tokio::test]
    async fn leaderboard_is_ranked_and_defaults_to_25() {
        let repo = InMemoryRepository::new();
        for i in 0..30 {
            repo.append_result(&record(&format!("u{i}"), "History", i % 10, 0, 60))
                .await
                .unwrap();
        }
        let svc = ResultsService::new(Arc::new(repo));

        let board = svc.leaderboard(None).await.unwrap();
        assert_eq!(board.len(), 25);
        assert_eq!(board[0].rank, 1);
        assert!((board[0].percentage - 90.0).abs() < 1e-9);
        assert!(board.windows(2).all(|w| w[0].percentage >= w[1].percentage));

        assert_eq!(svc.leaderboard(Some(3)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dashboard_aggregates_history() {
        let repo = InMemoryRepository::new();
        repo.append_result(&record("dev", "History", 5, 0, 60)).await.unwrap();
        repo.append_result(&record("dev", "Geography", 9, 1, 60)).await.unwrap();
        repo.append_result(&record("dev", "History", 7, 3, 60)).await.unwrap();
        repo.append_result(&record("other", "History", 10, 0, 60)).await.unwrap();

        let stats = ResultsService::new(Arc::new(repo))
            .dashboard("dev")
            .await
            .unwrap();
        assert_eq!(stats.tests_taken, 3);
        assert_eq!(stats.total_correct, 21);
        assert_eq!(stats.total_wrong, 4);

        // 50.0, 86.7, 60.0
        assert!((stats.average_percentage - (50.0 + 86.7 + 60.0) / 3.0).abs() < 1e-9);
        let best = stats.best.unwrap();
        assert_eq!(best.record.subject, "Geography");
        let best_subject = stats.best_subject.unwrap();
        assert_eq!(best_subject.subject, "Geography");
        assert_eq!(best_subject.tests_taken, 1);
    }

    #[test]
    fn empty_history_has_no_best() {
        let stats = DashboardStats::from_history(&[]);
        assert_eq!(stats.tests_taken, 0);
        assert!((stats.average_percentage - 0.0).abs() < 1e-9);
        assert!(stats.best.is_none());
        assert!(stats.best_subject.is_none());
    }
}
