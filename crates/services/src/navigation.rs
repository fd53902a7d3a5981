//! Screen flow of the quiz app as an explicit state machine.
//!
//! ```text
//! Landing -> Dashboard -> ModeSelect -> ChapterSelect -> Test -> Results
//!                 \-> Leaderboard (from any signed-in screen except Test)
//! ```
//!
//! The navigator only tracks where the user is. Starting and scoring tests is
//! left to [`crate::TestLoopService`]; the navigator hands back a
//! [`TestPlan`] whenever a move lands on the test screen.

use std::sync::Arc;

use gradeup_core::model::{QuestionBank, TestMode};

use crate::error::NavigationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Dashboard,
    ModeSelect { subject: String },
    ChapterSelect { subject: String },
    Test,
    Results,
    Leaderboard,
}

impl Screen {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Landing => "landing",
            Screen::Dashboard => "dashboard",
            Screen::ModeSelect { .. } => "mode select",
            Screen::ChapterSelect { .. } => "chapter select",
            Screen::Test => "test",
            Screen::Results => "results",
            Screen::Leaderboard => "leaderboard",
        }
    }
}

/// Which test to start once navigation reaches [`Screen::Test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    pub subject: String,
    pub chapter: Option<String>,
    pub mode: TestMode,
}

pub struct Navigator {
    bank: Arc<QuestionBank>,
    screen: Screen,
    user: Option<String>,
}

impl Navigator {
    #[must_use]
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self {
            bank,
            screen: Screen::Landing,
            user: None,
        }
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Name of the signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn invalid(&self, action: &'static str) -> NavigationError {
        NavigationError::InvalidTransition {
            from: self.screen.name(),
            action,
        }
    }

    /// # Errors
    ///
    /// Only valid on the landing screen.
    pub fn sign_in(&mut self, user: &str) -> Result<(), NavigationError> {
        if self.screen != Screen::Landing {
            return Err(self.invalid("sign in"));
        }
        self.user = Some(user.to_owned());
        self.screen = Screen::Dashboard;
        Ok(())
    }

    /// # Errors
    ///
    /// Only valid on the dashboard. Returns `NavigationError::Bank` for an
    /// unknown subject.
    pub fn choose_subject(&mut self, subject: &str) -> Result<(), NavigationError> {
        if self.screen != Screen::Dashboard {
            return Err(self.invalid("choose a subject"));
        }
        self.bank.list_chapters(subject)?;
        self.screen = Screen::ModeSelect {
            subject: subject.to_owned(),
        };
        Ok(())
    }

    /// Pick chapter practice. A subject with a single chapter goes straight
    /// to the test and returns its plan; otherwise the chapter list is shown.
    ///
    /// # Errors
    ///
    /// Only valid on the mode select screen.
    pub fn choose_chapter_practice(&mut self) -> Result<Option<TestPlan>, NavigationError> {
        let Screen::ModeSelect { subject } = &self.screen else {
            return Err(self.invalid("choose chapter practice"));
        };
        let subject = subject.clone();
        let chapters = self.bank.list_chapters(&subject)?;

        if let [only] = chapters.as_slice() {
            let plan = TestPlan {
                subject,
                chapter: Some((*only).to_owned()),
                mode: TestMode::Chapter,
            };
            self.screen = Screen::Test;
            return Ok(Some(plan));
        }

        self.screen = Screen::ChapterSelect { subject };
        Ok(None)
    }

    /// # Errors
    ///
    /// Only valid on the mode select screen.
    pub fn choose_full_mock(&mut self) -> Result<TestPlan, NavigationError> {
        let Screen::ModeSelect { subject } = &self.screen else {
            return Err(self.invalid("choose a full mock"));
        };
        let plan = TestPlan {
            subject: subject.clone(),
            chapter: None,
            mode: TestMode::Full,
        };
        self.screen = Screen::Test;
        Ok(plan)
    }

    /// # Errors
    ///
    /// Only valid on the chapter select screen. Returns
    /// `NavigationError::Bank` for an unknown chapter.
    pub fn choose_chapter(&mut self, chapter: &str) -> Result<TestPlan, NavigationError> {
        let Screen::ChapterSelect { subject } = &self.screen else {
            return Err(self.invalid("choose a chapter"));
        };
        self.bank.chapter_questions(subject, chapter)?;
        let plan = TestPlan {
            subject: subject.clone(),
            chapter: Some(chapter.to_owned()),
            mode: TestMode::Chapter,
        };
        self.screen = Screen::Test;
        Ok(plan)
    }

    /// The test was submitted or ran out of time.
    ///
    /// # Errors
    ///
    /// Only valid on the test screen.
    pub fn finish_test(&mut self) -> Result<(), NavigationError> {
        if self.screen != Screen::Test {
            return Err(self.invalid("finish a test"));
        }
        self.screen = Screen::Results;
        Ok(())
    }

    /// # Errors
    ///
    /// Requires a signed-in user and is blocked while a test is running.
    pub fn open_leaderboard(&mut self) -> Result<(), NavigationError> {
        if matches!(self.screen, Screen::Landing | Screen::Test) {
            return Err(self.invalid("open the leaderboard"));
        }
        self.screen = Screen::Leaderboard;
        Ok(())
    }

    /// Step back one screen.
    ///
    /// # Errors
    ///
    /// Not available on the landing, dashboard or test screens.
    pub fn back(&mut self) -> Result<(), NavigationError> {
        self.screen = match &self.screen {
            Screen::ChapterSelect { subject } => Screen::ModeSelect {
                subject: subject.clone(),
            },
            Screen::ModeSelect { .. } | Screen::Results | Screen::Leaderboard => Screen::Dashboard,
            Screen::Landing | Screen::Dashboard | Screen::Test => {
                return Err(self.invalid("go back"));
            }
        };
        Ok(())
    }

    /// Sign out and return to the landing screen. Yields the name that was
    /// signed in so the caller can forget it.
    ///
    /// # Errors
    ///
    /// Requires a signed-in user and is blocked while a test is running.
    pub fn logout(&mut self) -> Result<String, NavigationError> {
        if self.screen == Screen::Test {
            return Err(self.invalid("log out"));
        }
        let Some(user) = self.user.take() else {
            return Err(self.invalid("log out"));
        };
        self.screen = Screen::Landing;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeup_core::model::BankError;

    const BANK: &str = r#"{"subjects":[
        {"name":"Maths","chapters":[
            {"name":"Algebra","questions":[
                {"text":"Q1","options":["a","b","c","d"],"correct_option":"a","difficulty":"Medium"}
            ]},
            {"name":"Geometry","questions":[
                {"text":"Q2","options":["a","b","c","d"],"correct_option":"b","difficulty":"Medium"}
            ]}
        ]},
        {"name":"History","chapters":[
            {"name":"Indian History","questions":[
                {"text":"Q3","options":["a","b","c","d"],"correct_option":"c","difficulty":"Hard"}
            ]}
        ]}
    ]}"#;

    fn navigator() -> Navigator {
        Navigator::new(Arc::new(QuestionBank::from_json_str(BANK).unwrap()))
    }

    fn signed_in() -> Navigator {
        let mut nav = navigator();
        nav.sign_in("Anil").unwrap();
        nav
    }

    #[test]
    fn chapter_practice_flow() {
        let mut nav = signed_in();
        nav.choose_subject("Maths").unwrap();
        assert_eq!(nav.choose_chapter_practice().unwrap(), None);
        assert_eq!(
            nav.screen(),
            &Screen::ChapterSelect {
                subject: "Maths".into()
            }
        );

        let plan = nav.choose_chapter("Geometry").unwrap();
        assert_eq!(plan.chapter.as_deref(), Some("Geometry"));
        assert_eq!(plan.mode, TestMode::Chapter);
        assert_eq!(nav.screen(), &Screen::Test);

        nav.finish_test().unwrap();
        assert_eq!(nav.screen(), &Screen::Results);
        nav.back().unwrap();
        assert_eq!(nav.screen(), &Screen::Dashboard);
    }

    #[test]
    fn single_chapter_subject_skips_chapter_select() {
        let mut nav = signed_in();
        nav.choose_subject("History").unwrap();
        let plan = nav.choose_chapter_practice().unwrap().unwrap();
        assert_eq!(plan.chapter.as_deref(), Some("Indian History"));
        assert_eq!(nav.screen(), &Screen::Test);
    }

    #[test]
    fn full_mock_has_no_chapter() {
        let mut nav = signed_in();
        nav.choose_subject("Maths").unwrap();
        let plan = nav.choose_full_mock().unwrap();
        assert_eq!(plan.chapter, None);
        assert_eq!(plan.mode, TestMode::Full);
    }

    #[test]
    fn back_edges() {
        let mut nav = signed_in();
        nav.choose_subject("Maths").unwrap();
        nav.choose_chapter_practice().unwrap();
        nav.back().unwrap();
        assert_eq!(
            nav.screen(),
            &Screen::ModeSelect {
                subject: "Maths".into()
            }
        );
        nav.back().unwrap();
        assert_eq!(nav.screen(), &Screen::Dashboard);
        assert!(nav.back().is_err());
    }

    #[test]
    fn test_screen_can_only_be_left_by_finishing() {
        let mut nav = signed_in();
        nav.choose_subject("Maths").unwrap();
        nav.choose_full_mock().unwrap();

        let err = nav.back().unwrap_err();
        assert!(matches!(
            err,
            NavigationError::InvalidTransition { from: "test", action: "go back" }
        ));
        assert!(nav.open_leaderboard().is_err());
        assert!(nav.logout().is_err());
        assert_eq!(nav.user(), Some("Anil"));
    }

    #[test]
    fn leaderboard_and_logout() {
        let mut nav = signed_in();
        nav.open_leaderboard().unwrap();
        assert_eq!(nav.screen(), &Screen::Leaderboard);
        assert_eq!(nav.logout().unwrap(), "Anil");
        assert_eq!(nav.screen(), &Screen::Landing);
        assert_eq!(nav.user(), None);
        assert!(nav.open_leaderboard().is_err());
        assert!(nav.logout().is_err());
    }

    #[test]
    fn unknown_subject_or_chapter_is_rejected() {
        let mut nav = signed_in();
        assert!(matches!(
            nav.choose_subject("Art"),
            Err(NavigationError::Bank(BankError::SubjectNotFound(_)))
        ));
        assert_eq!(nav.screen(), &Screen::Dashboard);

        nav.choose_subject("Maths").unwrap();
        nav.choose_chapter_practice().unwrap();
        assert!(matches!(
            nav.choose_chapter("Calculus"),
            Err(NavigationError::Bank(BankError::ChapterNotFound { .. }))
        ));
    }

    #[test]
    fn sign_in_only_from_landing() {
        let mut nav = signed_in();
        assert!(nav.sign_in("Other").is_err());
    }
}
