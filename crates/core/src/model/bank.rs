use once_cell::sync::OnceCell;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};
use crate::model::settings::TestMode;

const BUILTIN_BANK_JSON: &str = include_str!("../../data/question_bank.json");

static BUILTIN_BANK: OnceCell<QuestionBank> = OnceCell::new();

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("chapter not found: {subject} / {chapter}")]
    ChapterNotFound { subject: String, chapter: String },

    #[error("no questions available for {subject} (chapter: {chapter:?})")]
    EmptyPool {
        subject: String,
        chapter: Option<String>,
    },

    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid question #{position} in {subject} / {chapter}: {source}")]
    InvalidQuestion {
        subject: String,
        chapter: String,
        position: usize,
        #[source]
        source: QuestionError,
    },

    #[error("subject has no chapters: {0}")]
    EmptySubject(String),

    #[error("chapter has no questions: {subject} / {chapter}")]
    EmptyChapter { subject: String, chapter: String },

    #[error("duplicate subject: {0}")]
    DuplicateSubject(String),

    #[error("duplicate chapter: {subject} / {chapter}")]
    DuplicateChapter { subject: String, chapter: String },
}

//
// ─── DOCUMENT SHAPE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct BankDocument {
    subjects: Vec<SubjectDocument>,
}

#[derive(Debug, Deserialize)]
struct SubjectDocument {
    name: String,
    chapters: Vec<ChapterDocument>,
}

#[derive(Debug, Deserialize)]
struct ChapterDocument {
    name: String,
    questions: Vec<QuestionDraft>,
}

//
// ─── BANK ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chapter {
    name: String,
    questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Subject {
    name: String,
    chapters: Vec<Chapter>,
}

/// Read-only catalog of questions grouped by subject and chapter.
///
/// Subjects and chapters keep the order of the source document. Nothing in
/// this type mutates after loading; sampling always hands out copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    subjects: Vec<Subject>,
}

impl QuestionBank {
    /// The bank shipped with the crate, parsed once per process.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the embedded document fails validation.
    pub fn builtin() -> Result<&'static QuestionBank, BankError> {
        BUILTIN_BANK.get_or_try_init(|| Self::from_json_str(BUILTIN_BANK_JSON))
    }

    /// Load and validate a bank document.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Parse` for malformed JSON and the structural
    /// variants when a subject, chapter or question breaks an invariant.
    pub fn from_json_str(json: &str) -> Result<Self, BankError> {
        let doc: BankDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    fn from_document(doc: BankDocument) -> Result<Self, BankError> {
        let mut next_id = 1_u64;
        let mut subject_names = HashSet::new();
        let mut subjects = Vec::with_capacity(doc.subjects.len());

        for subject in doc.subjects {
            if !subject_names.insert(subject.name.clone()) {
                return Err(BankError::DuplicateSubject(subject.name));
            }
            if subject.chapters.is_empty() {
                return Err(BankError::EmptySubject(subject.name));
            }

            let mut chapter_names = HashSet::new();
            let mut chapters = Vec::with_capacity(subject.chapters.len());
            for chapter in subject.chapters {
                if !chapter_names.insert(chapter.name.clone()) {
                    return Err(BankError::DuplicateChapter {
                        subject: subject.name,
                        chapter: chapter.name,
                    });
                }
                if chapter.questions.is_empty() {
                    return Err(BankError::EmptyChapter {
                        subject: subject.name,
                        chapter: chapter.name,
                    });
                }

                let mut questions = Vec::with_capacity(chapter.questions.len());
                for (position, draft) in chapter.questions.into_iter().enumerate() {
                    let question = draft.validate(QuestionId::new(next_id)).map_err(|source| {
                        BankError::InvalidQuestion {
                            subject: subject.name.clone(),
                            chapter: chapter.name.clone(),
                            position: position + 1,
                            source,
                        }
                    })?;
                    next_id += 1;
                    questions.push(question);
                }

                chapters.push(Chapter {
                    name: chapter.name,
                    questions,
                });
            }

            subjects.push(Subject {
                name: subject.name,
                chapters,
            });
        }

        Ok(Self { subjects })
    }

    /// Subject names in catalog order.
    #[must_use]
    pub fn list_subjects(&self) -> Vec<&str> {
        self.subjects.iter().map(|s| s.name.as_str()).collect()
    }

    /// Chapter names of a subject in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `BankError::SubjectNotFound` for an unknown subject.
    pub fn list_chapters(&self, subject: &str) -> Result<Vec<&str>, BankError> {
        Ok(self
            .subject(subject)?
            .chapters
            .iter()
            .map(|c| c.name.as_str())
            .collect())
    }

    /// Number of questions across every chapter of a subject.
    ///
    /// # Errors
    ///
    /// Returns `BankError::SubjectNotFound` for an unknown subject.
    pub fn question_count(&self, subject: &str) -> Result<usize, BankError> {
        Ok(self
            .subject(subject)?
            .chapters
            .iter()
            .map(|c| c.questions.len())
            .sum())
    }

    /// The canonical (unshuffled) questions of one chapter.
    ///
    /// # Errors
    ///
    /// Returns `BankError::SubjectNotFound` or `BankError::ChapterNotFound`.
    pub fn chapter_questions(&self, subject: &str, chapter: &str) -> Result<&[Question], BankError> {
        Ok(&self.chapter(subject, chapter)?.questions)
    }

    /// Draw questions for a new test using thread-local randomness.
    ///
    /// See [`QuestionBank::sample_questions_with`].
    ///
    /// # Errors
    ///
    /// Returns `BankError::SubjectNotFound`, `BankError::ChapterNotFound` or
    /// `BankError::EmptyPool`.
    pub fn sample_questions(
        &self,
        subject: &str,
        chapter: Option<&str>,
        mode: TestMode,
        limit: usize,
    ) -> Result<Vec<Question>, BankError> {
        self.sample_questions_with(subject, chapter, mode, limit, &mut rand::rng())
    }

    /// Draw questions for a new test.
    ///
    /// The pool is the named chapter, or every chapter of `subject` when
    /// `chapter` is `None`. `TestMode::Chapter` takes `min(limit, pool)`
    /// questions without replacement; `TestMode::Full` takes the whole pool.
    /// Either way the order is random and each returned question carries its
    /// own independently shuffled options.
    ///
    /// # Errors
    ///
    /// Returns `BankError::SubjectNotFound`, `BankError::ChapterNotFound` or
    /// `BankError::EmptyPool`.
    pub fn sample_questions_with<R: Rng + ?Sized>(
        &self,
        subject: &str,
        chapter: Option<&str>,
        mode: TestMode,
        limit: usize,
        rng: &mut R,
    ) -> Result<Vec<Question>, BankError> {
        let mut pool = self.pool(subject, chapter)?;
        if pool.is_empty() {
            return Err(BankError::EmptyPool {
                subject: subject.to_owned(),
                chapter: chapter.map(str::to_owned),
            });
        }

        let take = match mode {
            TestMode::Chapter => limit.min(pool.len()),
            TestMode::Full => pool.len(),
        };
        pool.shuffle(rng);
        pool.truncate(take);

        let mut picked = Vec::with_capacity(pool.len());
        for question in pool {
            picked.push(question.shuffled(rng));
        }
        Ok(picked)
    }

    fn pool(&self, subject: &str, chapter: Option<&str>) -> Result<Vec<&Question>, BankError> {
        match chapter {
            Some(chapter) => Ok(self.chapter(subject, chapter)?.questions.iter().collect()),
            None => Ok(self
                .subject(subject)?
                .chapters
                .iter()
                .flat_map(|c| c.questions.iter())
                .collect()),
        }
    }

    fn subject(&self, name: &str) -> Result<&Subject, BankError> {
        self.subjects
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| BankError::SubjectNotFound(name.to_owned()))
    }

    fn chapter(&self, subject: &str, chapter: &str) -> Result<&Chapter, BankError> {
        self.subject(subject)?
            .chapters
            .iter()
            .find(|c| c.name == chapter)
            .ok_or_else(|| BankError::ChapterNotFound {
                subject: subject.to_owned(),
                chapter: chapter.to_owned(),
            })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn question_json(n: usize) -> String {
        format!(
            r#"{{"text":"Q{n}","options":["a{n}","b{n}","c{n}","d{n}"],"correct_option":"c{n}","difficulty":"Hard"}}"#
        )
    }

    fn chapter_json(name: &str, range: std::ops::Range<usize>) -> String {
        let qs: Vec<String> = range.map(question_json).collect();
        format!(r#"{{"name":"{name}","questions":[{}]}}"#, qs.join(","))
    }

    fn small_bank() -> QuestionBank {
        let json = format!(
            r#"{{"subjects":[
                {{"name":"Maths","chapters":[{},{}]}},
                {{"name":"History","chapters":[{}]}}
            ]}}"#,
            chapter_json("Algebra", 0..30),
            chapter_json("Geometry", 30..42),
            chapter_json("Ancient", 42..45),
        );
        QuestionBank::from_json_str(&json).unwrap()
    }

    #[test]
    fn lists_subjects_and_chapters_in_document_order() {
        let bank = small_bank();
        assert_eq!(bank.list_subjects(), vec!["Maths", "History"]);
        assert_eq!(bank.list_chapters("Maths").unwrap(), vec!["Algebra", "Geometry"]);
        assert_eq!(bank.question_count("Maths").unwrap(), 42);
    }

    #[test]
    fn unknown_subject_is_not_found() {
        let bank = small_bank();
        let err = bank
            .sample_questions("NotASubject", None, TestMode::Full, 10)
            .unwrap_err();
        assert!(matches!(err, BankError::SubjectNotFound(s) if s == "NotASubject"));
        assert!(matches!(
            bank.list_chapters("NotASubject"),
            Err(BankError::SubjectNotFound(_))
        ));
        assert_eq!(bank, small_bank());
    }

    #[test]
    fn unknown_chapter_is_not_found() {
        let bank = small_bank();
        let err = bank
            .sample_questions("Maths", Some("Calculus"), TestMode::Chapter, 10)
            .unwrap_err();
        assert!(matches!(err, BankError::ChapterNotFound { .. }));
    }

    #[test]
    fn chapter_mode_takes_min_of_limit_and_pool() {
        let bank = small_bank();
        let qs = bank
            .sample_questions("Maths", Some("Algebra"), TestMode::Chapter, 20)
            .unwrap();
        assert_eq!(qs.len(), 20);

        let qs = bank
            .sample_questions("Maths", Some("Geometry"), TestMode::Chapter, 20)
            .unwrap();
        assert_eq!(qs.len(), 12);
    }

    #[test]
    fn chapter_mode_never_repeats_a_question() {
        let bank = small_bank();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let qs = bank
                .sample_questions_with("Maths", None, TestMode::Chapter, 25, &mut rng)
                .unwrap();
            let ids: HashSet<_> = qs.iter().map(Question::id).collect();
            assert_eq!(ids.len(), qs.len());
        }
    }

    #[test]
    fn full_mode_returns_whole_subject_pool_once() {
        let bank = small_bank();
        let qs = bank.sample_questions("Maths", None, TestMode::Full, 5).unwrap();
        assert_eq!(qs.len(), 42);

        let ids: HashSet<_> = qs.iter().map(|q| q.id().value()).collect();
        let expected: HashSet<_> = (1..=42).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn full_mode_with_chapter_stays_inside_chapter() {
        let bank = small_bank();
        let qs = bank
            .sample_questions("Maths", Some("Geometry"), TestMode::Full, 1)
            .unwrap();
        let allowed: HashSet<_> = bank
            .chapter_questions("Maths", "Geometry")
            .unwrap()
            .iter()
            .map(Question::id)
            .collect();
        assert_eq!(qs.len(), allowed.len());
        assert!(qs.iter().all(|q| allowed.contains(&q.id())));
    }

    #[test]
    fn sampled_copies_keep_correct_option_and_leave_bank_untouched() {
        let bank = small_bank();
        let before = bank.clone();
        let originals: HashMap<_, _> = bank
            .chapter_questions("Maths", "Algebra")
            .unwrap()
            .iter()
            .map(|q| (q.id(), q.clone()))
            .collect();

        let qs = bank
            .sample_questions("Maths", Some("Algebra"), TestMode::Full, 0)
            .unwrap();
        for q in &qs {
            let original = &originals[&q.id()];
            assert_eq!(q.correct_option(), original.correct_option());
            assert!(q.has_option(original.correct_option()));
        }
        assert_eq!(bank, before);
    }

    #[test]
    fn repeated_draws_differ() {
        let bank = small_bank();
        let draws: HashSet<Vec<String>> = (0..10)
            .map(|_| {
                bank.sample_questions("Maths", None, TestMode::Full, 0)
                    .unwrap()
                    .iter()
                    .flat_map(|q| q.options().to_vec())
                    .collect()
            })
            .collect();
        assert!(draws.len() > 1);
    }

    #[test]
    fn empty_pool_is_reported() {
        let bank = QuestionBank {
            subjects: vec![Subject {
                name: "Empty".into(),
                chapters: vec![Chapter {
                    name: "Nothing".into(),
                    questions: Vec::new(),
                }],
            }],
        };
        let err = bank
            .sample_questions("Empty", None, TestMode::Full, 10)
            .unwrap_err();
        assert!(matches!(err, BankError::EmptyPool { chapter: None, .. }));
    }

    #[test]
    fn loader_rejects_structural_problems() {
        let empty_subject = r#"{"subjects":[{"name":"X","chapters":[]}]}"#;
        assert!(matches!(
            QuestionBank::from_json_str(empty_subject),
            Err(BankError::EmptySubject(_))
        ));

        let empty_chapter = r#"{"subjects":[{"name":"X","chapters":[{"name":"C","questions":[]}]}]}"#;
        assert!(matches!(
            QuestionBank::from_json_str(empty_chapter),
            Err(BankError::EmptyChapter { .. })
        ));

        let dup = format!(
            r#"{{"subjects":[{{"name":"X","chapters":[{}]}},{{"name":"X","chapters":[{}]}}]}}"#,
            chapter_json("A", 0..1),
            chapter_json("B", 1..2),
        );
        assert!(matches!(
            QuestionBank::from_json_str(&dup),
            Err(BankError::DuplicateSubject(_))
        ));

        assert!(matches!(
            QuestionBank::from_json_str("{not json"),
            Err(BankError::Parse(_))
        ));
    }

    #[test]
    fn loader_reports_bad_question_position() {
        let json = r#"{"subjects":[{"name":"X","chapters":[{"name":"C","questions":[
            {"text":"ok","options":["a","b","c","d"],"correct_option":"a","difficulty":"Medium"},
            {"text":"bad","options":["a","b","c","d"],"correct_option":"z","difficulty":"Medium"}
        ]}]}]}"#;
        let err = QuestionBank::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            BankError::InvalidQuestion { position: 2, source: QuestionError::MissingCorrectOption(_), .. }
        ));
    }

    #[test]
    fn builtin_bank_loads() {
        let bank = QuestionBank::builtin().unwrap();
        let subjects = bank.list_subjects();
        assert_eq!(subjects.len(), 6);
        assert!(subjects.contains(&"General Science"));
        assert_eq!(
            bank.list_chapters("General Science").unwrap(),
            vec!["Physics", "Chemistry", "Biology"]
        );
        for subject in subjects {
            assert!(bank.question_count(subject).unwrap() > 0);
        }
        assert!(std::ptr::eq(bank, QuestionBank::builtin().unwrap()));
    }
}
