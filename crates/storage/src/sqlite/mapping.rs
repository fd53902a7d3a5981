use gradeup_core::model::{Course, ResultId, TestMode, TestResult, User};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ResultRecord, ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let course: Course = row
        .try_get::<String, _>("course")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    User::new(
        row.try_get::<String, _>("name").map_err(ser)?,
        course,
        row.try_get("registered_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ResultRow, StorageError> {
    let mode: TestMode = row
        .try_get::<String, _>("mode")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let elapsed: i64 = row.try_get("elapsed_seconds").map_err(ser)?;
    let elapsed_seconds = u64::try_from(elapsed)
        .map_err(|_| StorageError::Serialization(format!("invalid elapsed_seconds: {elapsed}")))?;

    let result = TestResult::from_persisted(
        u32_from_i64("question_count", row.try_get("question_count").map_err(ser)?)?,
        u32_from_i64("correct", row.try_get("correct").map_err(ser)?)?,
        u32_from_i64("wrong", row.try_get("wrong").map_err(ser)?)?,
        u32_from_i64("unattempted", row.try_get("unattempted").map_err(ser)?)?,
        row.try_get("raw_score").map_err(ser)?,
        row.try_get("total_marks").map_err(ser)?,
        row.try_get("percentage").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        elapsed_seconds,
    )
    .map_err(ser)?;

    Ok(ResultRow::new(
        ResultId::new(row.try_get::<i64, _>("id").map_err(ser)?),
        ResultRecord {
            user: row.try_get("user_name").map_err(ser)?,
            subject: row.try_get("subject").map_err(ser)?,
            chapter: row.try_get("chapter").map_err(ser)?,
            mode,
            result,
        },
    ))
}
