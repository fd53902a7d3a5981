mod bank;
mod ids;
mod question;
mod result;
mod session;
mod settings;
mod user;

pub use ids::{ParseIdError, QuestionId, ResultId};

pub use bank::{BankError, QuestionBank};
pub use question::{Difficulty, OPTION_COUNT, Question, QuestionDraft, QuestionError};
pub use result::{QuestionOutcome, ResultError, Score, TestResult};
pub use session::{AnswerReview, SessionError, SessionProgress, SessionState, TestSession};
pub use settings::{ExamSettings, MarkingScheme, SettingsError, TestMode};
pub use user::{Course, User, UserError, normalize_name};
