use std::fmt;
use std::path::{Path, PathBuf};

use gradeup_core::model::{Course, ExamSettings, MarkingScheme, SettingsError, UserError};

pub const DEFAULT_DB_URL: &str = "sqlite://gradeup.db";

pub const ENV_DB_URL: &str = "GRADEUP_DB_URL";
pub const ENV_MARKS_CORRECT: &str = "GRADEUP_MARKS_CORRECT";
pub const ENV_MARKS_WRONG: &str = "GRADEUP_MARKS_WRONG";
pub const ENV_CHAPTER_LIMIT: &str = "GRADEUP_CHAPTER_LIMIT";
pub const ENV_CHAPTER_SECS: &str = "GRADEUP_CHAPTER_SECS";
pub const ENV_FULL_SECS: &str = "GRADEUP_FULL_SECS";

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    ConflictingFlags { first: &'static str, second: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidEnv { key: &'static str, raw: String },
    Settings(SettingsError),
    Course(UserError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::ConflictingFlags { first, second } => {
                write!(f, "{first} and {second} cannot be used together")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidEnv { key, raw } => write!(f, "invalid {key} value: {raw}"),
            ArgsError::Settings(err) => write!(f, "invalid exam settings: {err}"),
            ArgsError::Course(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Database URL from the environment, or the default.
pub fn db_url_from_env(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(ENV_DB_URL)
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url)
}

pub fn parse_db_flag(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(normalize_sqlite_url(value))
}

fn env_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ArgsError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ArgsError::InvalidEnv { key, raw }),
    }
}

/// Exam settings from `GRADEUP_*` variables; unset ones keep their defaults.
pub fn settings_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ExamSettings, ArgsError> {
    let defaults = ExamSettings::default();
    let marking = MarkingScheme::new(
        env_number(&lookup, ENV_MARKS_CORRECT, MarkingScheme::DEFAULT_MARKS_PER_CORRECT)?,
        env_number(&lookup, ENV_MARKS_WRONG, MarkingScheme::DEFAULT_MARKS_PER_WRONG)?,
    )
    .map_err(ArgsError::Settings)?;

    ExamSettings::new(
        env_number(&lookup, ENV_CHAPTER_LIMIT, defaults.chapter_question_limit())?,
        env_number(&lookup, ENV_CHAPTER_SECS, defaults.chapter_duration_secs())?,
        env_number(&lookup, ENV_FULL_SECS, defaults.full_duration_secs())?,
        marking,
    )
    .map_err(ArgsError::Settings)
}

pub fn parse_course(raw: &str) -> Result<Course, ArgsError> {
    raw.parse().map_err(ArgsError::Course)
}

pub fn parse_limit(raw: String) -> Result<u32, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ArgsError::InvalidNumber {
            flag: "--limit",
            raw,
        }),
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Make sure the directory holding a file database exists. The connection
/// itself creates the file.
pub fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
