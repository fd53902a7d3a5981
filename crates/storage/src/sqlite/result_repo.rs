use gradeup_core::model::ResultId;

use super::SqliteRepository;
use super::mapping::{conn, map_result_row, u64_to_i64};
use crate::repository::{ResultRecord, ResultRepository, ResultRow, StorageError};

const RESULT_COLUMNS: &str = "id, user_name, subject, chapter, mode, question_count, correct, \
     wrong, unattempted, raw_score, total_marks, percentage, elapsed_seconds, started_at, \
     completed_at";

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, record: &ResultRecord) -> Result<ResultId, StorageError> {
        let result = &record.result;
        let res = sqlx::query(
            r"
            INSERT INTO results (
                user_name, subject, chapter, mode, question_count, correct, wrong, unattempted,
                raw_score, total_marks, percentage, elapsed_seconds, started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(&record.user)
        .bind(&record.subject)
        .bind(record.chapter.as_deref())
        .bind(record.mode.as_str())
        .bind(i64::from(result.question_count()))
        .bind(i64::from(result.correct_count()))
        .bind(i64::from(result.wrong_count()))
        .bind(i64::from(result.unattempted_count()))
        .bind(result.raw_score())
        .bind(result.total_possible_marks())
        .bind(result.percentage())
        .bind(u64_to_i64("elapsed_seconds", result.elapsed_seconds())?)
        .bind(result.started_at())
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(ResultId::new(res.last_insert_rowid()))
    }

    async fn get_result(&self, id: ResultId) -> Result<ResultRow, StorageError> {
        let row = sqlx::query(&format!("SELECT {RESULT_COLUMNS} FROM results WHERE id = ?1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => map_result_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_user_results(&self, user: &str) -> Result<Vec<ResultRow>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE user_name = ?1 ORDER BY id ASC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<ResultRow>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {RESULT_COLUMNS} FROM results \
             ORDER BY percentage DESC, elapsed_seconds ASC, id ASC LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
