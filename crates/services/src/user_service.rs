use std::sync::Arc;

use gradeup_core::model::{Course, User, normalize_name};
use storage::repository::UserRepository;

use crate::Clock;
use crate::error::UserServiceError;

/// Sign-in bookkeeping. A user is just a name and a target course.
#[derive(Clone)]
pub struct UserService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Register `name`, or switch the course of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::User` for a blank name and
    /// `UserServiceError::Storage` if the write fails.
    pub async fn register(&self, name: &str, course: Course) -> Result<User, UserServiceError> {
        let user = User::new(name, course, self.clock.now())?;
        self.users.upsert_user(&user).await?;
        let stored = self.users.get_user(user.name()).await?.unwrap_or(user);
        tracing::info!(user = stored.name(), course = %stored.course(), "user registered");
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns `UserServiceError::User` for a blank name and
    /// `UserServiceError::Storage` if the lookup fails.
    pub async fn find(&self, name: &str) -> Result<Option<User>, UserServiceError> {
        let name = normalize_name(name)?;
        Ok(self.users.get_user(&name).await?)
    }

    /// Drop the user row on logout. Stored results stay on the leaderboard.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::User` for a blank name and
    /// `UserServiceError::Storage` if the delete fails.
    pub async fn forget(&self, name: &str) -> Result<bool, UserServiceError> {
        let name = normalize_name(name)?;
        let removed = self.users.delete_user(&name).await?;
        tracing::info!(user = %name, removed, "user signed out");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gradeup_core::model::UserError;
    use gradeup_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn register_find_and_forget() {
        let repo = Arc::new(InMemoryRepository::new());
        let svc = UserService::new(Clock::fixed(fixed_now()), repo.clone());

        let user = svc.register("  Priya ", Course::Cds).await.unwrap();
        assert_eq!(user.name(), "Priya");

        let found = svc.find("Priya").await.unwrap().unwrap();
        assert_eq!(found.course(), Course::Cds);

        assert!(svc.forget(" Priya").await.unwrap());
        assert!(svc.find("Priya").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn re_registering_switches_course_only() {
        let repo = Arc::new(InMemoryRepository::new());
        let first = UserService::new(Clock::fixed(fixed_now()), repo.clone());
        first.register("Vikram", Course::Nda).await.unwrap();

        let later = UserService::new(Clock::fixed(fixed_now() + Duration::days(2)), repo);
        let user = later.register("Vikram", Course::Afcat).await.unwrap();
        assert_eq!(user.course(), Course::Afcat);
        assert_eq!(user.registered_at(), fixed_now());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let svc = UserService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let err = svc.register("   ", Course::Nda).await.unwrap_err();
        assert!(matches!(err, UserServiceError::User(UserError::EmptyName)));
    }
}
