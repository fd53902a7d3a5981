use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("marks per correct answer must be finite and > 0, got {0}")]
    InvalidMarksPerCorrect(f64),

    #[error("marks per wrong answer must be finite and <= 0, got {0}")]
    InvalidMarksPerWrong(f64),

    #[error("chapter question limit must be > 0")]
    InvalidChapterLimit,

    #[error("test duration must be > 0 seconds")]
    InvalidDuration,

    #[error("unknown test mode: {0}")]
    UnknownMode(String),
}

//
// ─── TEST MODE ─────────────────────────────────────────────────────────────────
//

/// Focused chapter drill or a full mock spanning the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Sample up to the configured limit, without replacement.
    Chapter,
    /// Every question of the pool exactly once, in random order.
    Full,
}

impl TestMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestMode::Chapter => "chapter",
            TestMode::Full => "full",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapter" => Ok(TestMode::Chapter),
            "full" | "mock" => Ok(TestMode::Full),
            other => Err(SettingsError::UnknownMode(other.to_owned())),
        }
    }
}

//
// ─── MARKING ───────────────────────────────────────────────────────────────────
//

/// Marks awarded per correct answer and deducted per wrong answer.
///
/// Unattempted questions score zero. Deployments disagree on the penalty
/// (-1.33 for a 4-mark paper, -0.83 on some variants), so it is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkingScheme {
    marks_per_correct: f64,
    marks_per_wrong: f64,
}

impl MarkingScheme {
    pub const DEFAULT_MARKS_PER_CORRECT: f64 = 4.0;
    pub const DEFAULT_MARKS_PER_WRONG: f64 = -1.33;

    /// # Errors
    ///
    /// Returns `SettingsError` if the reward is not positive or the penalty is positive.
    pub fn new(marks_per_correct: f64, marks_per_wrong: f64) -> Result<Self, SettingsError> {
        if !marks_per_correct.is_finite() || marks_per_correct <= 0.0 {
            return Err(SettingsError::InvalidMarksPerCorrect(marks_per_correct));
        }
        if !marks_per_wrong.is_finite() || marks_per_wrong > 0.0 {
            return Err(SettingsError::InvalidMarksPerWrong(marks_per_wrong));
        }
        Ok(Self {
            marks_per_correct,
            marks_per_wrong,
        })
    }

    #[must_use]
    pub fn marks_per_correct(&self) -> f64 {
        self.marks_per_correct
    }

    #[must_use]
    pub fn marks_per_wrong(&self) -> f64 {
        self.marks_per_wrong
    }
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            marks_per_correct: Self::DEFAULT_MARKS_PER_CORRECT,
            marks_per_wrong: Self::DEFAULT_MARKS_PER_WRONG,
        }
    }
}

//
// ─── EXAM SETTINGS ─────────────────────────────────────────────────────────────
//

/// Per-deployment knobs for test construction and scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSettings {
    chapter_question_limit: usize,
    chapter_duration_secs: u32,
    full_duration_secs: u32,
    marking: MarkingScheme,
}

impl ExamSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if the limit or either duration is zero.
    pub fn new(
        chapter_question_limit: usize,
        chapter_duration_secs: u32,
        full_duration_secs: u32,
        marking: MarkingScheme,
    ) -> Result<Self, SettingsError> {
        if chapter_question_limit == 0 {
            return Err(SettingsError::InvalidChapterLimit);
        }
        if chapter_duration_secs == 0 || full_duration_secs == 0 {
            return Err(SettingsError::InvalidDuration);
        }
        Ok(Self {
            chapter_question_limit,
            chapter_duration_secs,
            full_duration_secs,
            marking,
        })
    }

    #[must_use]
    pub fn chapter_question_limit(&self) -> usize {
        self.chapter_question_limit
    }

    #[must_use]
    pub fn chapter_duration_secs(&self) -> u32 {
        self.chapter_duration_secs
    }

    #[must_use]
    pub fn full_duration_secs(&self) -> u32 {
        self.full_duration_secs
    }

    #[must_use]
    pub fn marking(&self) -> MarkingScheme {
        self.marking
    }

    /// Time budget for a test in the given mode.
    #[must_use]
    pub fn duration_for(&self, mode: TestMode) -> u32 {
        match mode {
            TestMode::Chapter => self.chapter_duration_secs,
            TestMode::Full => self.full_duration_secs,
        }
    }

    /// Sampling limit for a test in the given mode. Full mocks take the whole pool.
    #[must_use]
    pub fn question_limit_for(&self, mode: TestMode) -> usize {
        match mode {
            TestMode::Chapter => self.chapter_question_limit,
            TestMode::Full => usize::MAX,
        }
    }
}

impl Default for ExamSettings {
    /// 50-question chapter drills in 30 minutes, 60-minute full mocks, +4/-1.33.
    fn default() -> Self {
        Self {
            chapter_question_limit: 50,
            chapter_duration_secs: 1800,
            full_duration_secs: 3600,
            marking: MarkingScheme::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_marking_matches_four_mark_paper() {
        let m = MarkingScheme::default();
        assert!((m.marks_per_correct() - 4.0).abs() < f64::EPSILON);
        assert!((m.marks_per_wrong() + 1.33).abs() < f64::EPSILON);
    }

    #[test]
    fn marking_rejects_positive_penalty_and_zero_reward() {
        assert!(matches!(
            MarkingScheme::new(4.0, 0.5),
            Err(SettingsError::InvalidMarksPerWrong(_))
        ));
        assert!(matches!(
            MarkingScheme::new(0.0, -1.0),
            Err(SettingsError::InvalidMarksPerCorrect(_))
        ));
        assert!(MarkingScheme::new(2.5, -0.83).is_ok());
        assert!(MarkingScheme::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn settings_validate_limits() {
        let marking = MarkingScheme::default();
        assert_eq!(
            ExamSettings::new(0, 10, 10, marking).unwrap_err(),
            SettingsError::InvalidChapterLimit
        );
        assert_eq!(
            ExamSettings::new(20, 0, 10, marking).unwrap_err(),
            SettingsError::InvalidDuration
        );
    }

    #[test]
    fn duration_depends_on_mode() {
        let settings = ExamSettings::default();
        assert_eq!(settings.duration_for(TestMode::Chapter), 1800);
        assert_eq!(settings.duration_for(TestMode::Full), 3600);
        assert_eq!(settings.question_limit_for(TestMode::Chapter), 50);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Chapter".parse::<TestMode>().unwrap(), TestMode::Chapter);
        assert_eq!("mock".parse::<TestMode>().unwrap(), TestMode::Full);
        assert!("weekly".parse::<TestMode>().is_err());
        assert_eq!(TestMode::Full.to_string(), "full");
    }
}
