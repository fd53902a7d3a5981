use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("user name cannot be empty")]
    EmptyName,

    #[error("unknown course: {0}")]
    UnknownCourse(String),
}

/// Exam the aspirant is preparing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Course {
    #[serde(rename = "NDA")]
    Nda,
    #[serde(rename = "CDS")]
    Cds,
    #[serde(rename = "AFCAT")]
    Afcat,
}

impl Course {
    pub const ALL: [Course; 3] = [Course::Nda, Course::Cds, Course::Afcat];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Course::Nda => "NDA",
            Course::Cds => "CDS",
            Course::Afcat => "AFCAT",
        }
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Course {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Course::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UserError::UnknownCourse(wanted.to_owned()))
    }
}

/// A registered aspirant. Identified by name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    course: Course,
    registered_at: DateTime<Utc>,
}

impl User {
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` if the trimmed name is empty.
    pub fn new(
        name: impl AsRef<str>,
        course: Course,
        registered_at: DateTime<Utc>,
    ) -> Result<Self, UserError> {
        let name = normalize_name(name.as_ref())?;
        Ok(Self {
            name,
            course,
            registered_at,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn course(&self) -> Course {
        self.course
    }

    #[must_use]
    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

/// Trim a user name and reject blanks.
///
/// # Errors
///
/// Returns `UserError::EmptyName` if nothing is left after trimming.
pub fn normalize_name(raw: &str) -> Result<String, UserError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(UserError::EmptyName);
    }
    Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn name_is_trimmed() {
        let user = User::new("  Arjun ", Course::Nda, fixed_now()).unwrap();
        assert_eq!(user.name(), "Arjun");
    }

    #[test]
    fn blank_name_rejected() {
        assert_eq!(
            User::new(" \t", Course::Cds, fixed_now()).unwrap_err(),
            UserError::EmptyName
        );
    }

    #[test]
    fn course_parses_case_insensitively() {
        assert_eq!("afcat".parse::<Course>().unwrap(), Course::Afcat);
        assert_eq!(" CDS ".parse::<Course>().unwrap(), Course::Cds);
        assert!(matches!(
            "SSB".parse::<Course>(),
            Err(UserError::UnknownCourse(c)) if c == "SSB"
        ));
    }
}
