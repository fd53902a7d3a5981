use async_trait::async_trait;
use gradeup_core::model::User;

use super::SqliteRepository;
use super::mapping::{conn, map_user_row};
use crate::repository::{StorageError, UserRepository};

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (name, course, registered_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                course = excluded.course
            ",
        )
        .bind(user.name())
        .bind(user.course().as_str())
        .bind(user.registered_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_user(&self, name: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT name, course, registered_at FROM users WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn delete_user(&self, name: &str) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM users WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }
}
