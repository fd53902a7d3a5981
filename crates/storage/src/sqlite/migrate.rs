use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates users, results, and the leaderboard/history indexes.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    name TEXT PRIMARY KEY,
                    course TEXT NOT NULL CHECK (course IN ('NDA', 'CDS', 'AFCAT')),
                    registered_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // No foreign key to users: results outlive a logout.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_name TEXT NOT NULL,
                    subject TEXT NOT NULL,
                    chapter TEXT,
                    mode TEXT NOT NULL CHECK (mode IN ('chapter', 'full')),
                    question_count INTEGER NOT NULL CHECK (question_count >= 0),
                    correct INTEGER NOT NULL CHECK (correct >= 0),
                    wrong INTEGER NOT NULL CHECK (wrong >= 0),
                    unattempted INTEGER NOT NULL CHECK (unattempted >= 0),
                    raw_score REAL NOT NULL,
                    total_marks REAL NOT NULL CHECK (total_marks >= 0),
                    percentage REAL NOT NULL CHECK (percentage BETWEEN 0 AND 100),
                    elapsed_seconds INTEGER NOT NULL CHECK (elapsed_seconds >= 0),
                    started_at TEXT NOT NULL,
                    completed_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_results_leaderboard
                    ON results (percentage DESC, elapsed_seconds ASC, id ASC);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_results_user
                    ON results (user_name, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
